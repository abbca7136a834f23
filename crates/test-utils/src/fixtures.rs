//! Common filename templates used across tests.

/// Filename templates in the forms real instrument archives use.
pub mod templates {
    /// One empty marker file per day: `2009-01-01.nofile`
    pub const DAILY_NOFILE: &str = "{year:04d}-{month:02d}-{day:02d}.nofile";

    /// Day-of-year files below a year directory: `2009/data_2009001.cdf`
    pub const DOY_BY_YEAR: &str = "{year:04d}/data_{year:04d}{day:03d}.cdf";

    /// Versioned daily files parsed with `_` as delimiter: `vefi_2009_01_01_v1.cdf`
    pub const VERSIONED_DELIMITED: &str = "vefi_{year:04d}_{month:02d}_{day:02d}_v{version}.cdf";

    /// Versioned daily files with fixed widths: `ivm_20090101_v01_r02.cdf`
    pub const VERSIONED_FIXED: &str =
        "ivm_{year:04d}{month:02d}{day:02d}_v{version:02d}_r{revision:02d}.cdf";

    /// One file per month: `monthly_200901.nc`
    pub const MONTHLY: &str = "monthly_{year:04d}{month:02d}.nc";

    /// Sub-daily files: `hourly_20090101_06.dat`
    pub const HOURLY: &str = "hourly_{year:04d}{month:02d}{day:02d}_{hour:02d}.dat";
}

//! End-to-end inventory behaviour against real directories.

use std::sync::Arc;

use file_inventory::{
    Cadence, FileListStore, FileListing, InstrumentId, Inventory, LocalFileListing, Settings,
};
use inventory_common::Freq;
use test_utils::{
    assert_files_eq, daily_nofile_names, doy_names, monthly_names, templates, utc,
    versioned_names, TestArchive,
};

fn listing(template: &str) -> Arc<dyn FileListing> {
    Arc::new(LocalFileListing::parse(template).unwrap())
}

#[test]
fn test_get_new_returns_only_added_files() {
    let archive = TestArchive::new();
    archive.touch_all(daily_nofile_names(utc!(2009, 1, 1), utc!(2009, 1, 5)));

    let mut inventory = Inventory::new(archive.path(), listing(templates::DAILY_NOFILE)).unwrap();
    assert_eq!(inventory.len(), 5);

    archive.touch_all(daily_nofile_names(utc!(2009, 1, 6), utc!(2009, 1, 8)));
    let new = inventory.get_new().unwrap();
    assert_files_eq!(
        new.files(),
        ["2009-01-06.nofile", "2009-01-07.nofile", "2009-01-08.nofile"]
    );
    assert_eq!(inventory.len(), 8);
    assert_eq!(inventory.stop_date(), Some(utc!(2009, 1, 8)));

    assert!(inventory.get_new().unwrap().is_empty());
}

#[test]
fn test_refresh_tracks_removed_files() {
    let archive = TestArchive::new();
    archive.touch_all(daily_nofile_names(utc!(2009, 1, 1), utc!(2009, 1, 3)));
    let mut inventory = Inventory::new(archive.path(), listing(templates::DAILY_NOFILE)).unwrap();

    archive.remove("2009-01-01.nofile");
    inventory.refresh().unwrap();
    assert_eq!(inventory.start_date(), Some(utc!(2009, 1, 2)));
    assert_eq!(inventory.len(), 2);
}

#[test]
fn test_missing_directory_is_empty_inventory() {
    let archive = TestArchive::new();
    let inventory = Inventory::new(
        archive.path().join("not-created"),
        listing(templates::DAILY_NOFILE),
    )
    .unwrap();
    assert!(inventory.is_empty());
    assert_eq!(inventory.start_date(), None);
}

#[test]
fn test_monthly_files_expand_to_daily_rows() {
    let archive = TestArchive::new();
    archive.touch_all(monthly_names(2009, 1, 2));

    let listing = LocalFileListing::parse(templates::MONTHLY)
        .unwrap()
        .cadence(Cadence::new(Freq::months(1).unwrap()));
    let inventory = Inventory::new(archive.path(), Arc::new(listing)).unwrap();

    let january = inventory.files_between(utc!(2009, 1, 1), utc!(2009, 1, 31));
    assert_eq!(january.len(), 31);
    assert!(january.iter().all(|f| f.starts_with("monthly_200901.nc_")));
    assert_eq!(inventory.file_on(utc!(2009, 2, 14)), Some("monthly_200902.nc_2009-02-14"));
    assert_eq!(inventory.stop_date(), Some(utc!(2009, 2, 28)));
}

#[test]
fn test_newest_version_per_day() {
    let archive = TestArchive::new();
    archive.touch_all(versioned_names(utc!(2009, 1, 1), utc!(2009, 1, 3), &[1, 2]));
    archive.touch("vefi_2009_01_02_v10.cdf");

    let listing = LocalFileListing::parse(templates::VERSIONED_DELIMITED)
        .unwrap()
        .delimiter("_");
    let inventory = Inventory::new(archive.path(), Arc::new(listing)).unwrap();
    assert_files_eq!(
        inventory.table().files(),
        ["vefi_2009_01_01_v2.cdf", "vefi_2009_01_02_v10.cdf", "vefi_2009_01_03_v2.cdf"]
    );
}

#[test]
fn test_fixed_width_versions_and_revisions() {
    let archive = TestArchive::new();
    archive.touch_all([
        "ivm_20090101_v01_r02.cdf",
        "ivm_20090101_v01_r10.cdf",
        "ivm_20090101_v00_r99.cdf",
    ]);
    let inventory = Inventory::new(archive.path(), listing(templates::VERSIONED_FIXED)).unwrap();
    assert_files_eq!(inventory.table().files(), ["ivm_20090101_v01_r10.cdf"]);
}

#[test]
fn test_day_of_year_in_year_directories() {
    let archive = TestArchive::new();
    archive.touch_all(doy_names(utc!(2008, 12, 30), utc!(2009, 1, 2)));

    let inventory = Inventory::new(archive.path(), listing(templates::DOY_BY_YEAR)).unwrap();
    assert_eq!(inventory.len(), 4);
    assert_eq!(inventory.file(0), Some("2008/data_2008365.cdf"));
    assert_eq!(inventory.file_on(utc!(2009, 1, 1)), Some("2009/data_2009001.cdf"));
}

#[test]
fn test_ignore_empty_files() {
    let archive = TestArchive::new();
    archive.touch("2009-01-01.nofile");
    archive.touch_empty("2009-01-02.nofile");

    let all = Inventory::new(archive.path(), listing(templates::DAILY_NOFILE)).unwrap();
    assert_eq!(all.len(), 2);

    let listing = LocalFileListing::parse(templates::DAILY_NOFILE)
        .unwrap()
        .ignore_empty_files(true);
    let non_empty = Inventory::new(archive.path(), Arc::new(listing)).unwrap();
    assert_files_eq!(non_empty.table().files(), ["2009-01-01.nofile"]);
}

#[test]
fn test_sub_daily_files_keep_their_hour() {
    let archive = TestArchive::new();
    archive.touch_all(["hourly_20090101_06.dat", "hourly_20090101_00.dat", "hourly_20090101_12.dat"]);
    let inventory = Inventory::new(archive.path(), listing(templates::HOURLY)).unwrap();
    assert_eq!(inventory.len(), 3);
    assert_eq!(inventory.file_on(utc!(2009, 1, 1, 6)), Some("hourly_20090101_06.dat"));
}

#[test]
fn test_stored_list_survives_restart() {
    let archive = TestArchive::new();
    let state = TestArchive::new();
    let store_path = state.path().join("list.json");
    archive.touch_all(daily_nofile_names(utc!(2010, 6, 1), utc!(2010, 6, 3)));

    {
        let inventory = Inventory::with_store(
            archive.path(),
            listing(templates::DAILY_NOFILE),
            FileListStore::new(&store_path),
        )
        .unwrap();
        assert_eq!(inventory.len(), 3);
    }

    archive.touch_all(daily_nofile_names(utc!(2010, 6, 4), utc!(2010, 6, 5)));
    let mut inventory = Inventory::with_store(
        archive.path(),
        listing(templates::DAILY_NOFILE),
        FileListStore::new(&store_path),
    )
    .unwrap();
    let new = inventory.get_new().unwrap();
    assert_files_eq!(new.files(), ["2010-06-04.nofile", "2010-06-05.nofile"]);
}

#[test]
fn test_settings_locate_instrument_directory() {
    let root = TestArchive::new();
    let settings = Settings {
        data_dirs: vec![root.path().to_path_buf()],
        archive_dir: Some(root.path().join("archive")),
        ..Default::default()
    };
    let id = InstrumentId::new("cnofs", "vefi").with_tag("dc_b");

    let data_path = settings.ensure_data_path(&id).unwrap();
    assert!(data_path.ends_with("cnofs/vefi/dc_b"));
    assert!(data_path.is_dir());
    // Creating it twice is fine.
    settings.ensure_data_path(&id).unwrap();

    root.touch("cnofs/vefi/dc_b/2009-01-01.nofile");
    let inventory = Inventory::with_store(
        &data_path,
        listing(templates::DAILY_NOFILE),
        FileListStore::for_instrument(&settings, &id),
    )
    .unwrap();
    assert_eq!(inventory.len(), 1);
    assert!(settings.archive_path_for(&id).exists());
}

#[cfg(unix)]
#[test]
fn test_listing_includes_symlinked_files() {
    let store = TestArchive::new();
    let names = daily_nofile_names(utc!(2009, 2, 1), utc!(2009, 2, 3));
    store.touch_all(names.clone());

    let linked = TestArchive::new();
    for name in &names {
        std::os::unix::fs::symlink(store.path().join(name), linked.path().join(name)).unwrap();
    }

    let table = listing(templates::DAILY_NOFILE).list_files(linked.path()).unwrap();
    assert_files_eq!(table.files(), names);
}

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use diskimg::bpb::Bpb;
use diskimg::dir::DirEntry;
use diskimg::fat::FatType;
use diskimg::layout::{Sector, SECTOR_SIZE};
use diskimg::mbr::{self, PartitionEntry};
use diskimg::{create_file, plan, write_image_with_serial, Error, ErrorCode, Geometry, ImageRequest};

fn request(type_name: &str) -> ImageRequest {
    ImageRequest {
        type_name: type_name.into(),
        ..ImageRequest::default()
    }
}

fn render(req: &ImageRequest, serial: u32) -> Vec<u8> {
    let p = plan(req).unwrap();
    let mut sink = Cursor::new(Vec::new());
    write_image_with_serial(&p.image, &mut sink, serial).unwrap();
    sink.into_inner()
}

fn root_entry(img: &[u8], lba: u64) -> Option<DirEntry> {
    let at = lba as usize * SECTOR_SIZE;
    let rec: [u8; 32] = img[at..at + 32].try_into().unwrap();
    DirEntry::parse(&rec)
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("diskimg-{}-{}", std::process::id(), name))
}

#[test]
fn floppy_reads_back() {
    let img = render(&request("fd"), 0x1234_5678);
    let bpb = Bpb::parse(&Sector::read_from(&img, 0).unwrap()).unwrap();

    assert_eq!(bpb.total_sectors, 2880);
    assert_eq!(bpb.media, 0xF0);
    assert_eq!(bpb.drive_number, 0);
    assert_eq!(bpb.hidden_sectors, 0);
    assert_eq!(bpb.sectors_per_track, 18);
    assert_eq!(bpb.num_heads, 2);
    assert_eq!(bpb.root_entries, 224);
    assert_eq!(bpb.fat_size, 9);
    assert_eq!(bpb.volume_id, 0x1234_5678);
    assert_eq!(&bpb.volume_label, b"NO NAME    ");
    assert_eq!(bpb.fat_type, Some(FatType::Fat12));
    assert_eq!(bpb.cluster_count(), Some(2847));
    assert!(root_entry(&img, 19).is_none());
}

#[test]
fn hard_disk_reads_back() {
    let mut req = request("hd");
    req.size_mib = Some(50);
    req.fs.label = Some("work".into());
    let img = render(&req, 1);

    let table = PartitionEntry::decode(&Sector::read_from(&img, 0).unwrap());
    assert_eq!(table.partition_type, mbr::TYPE_FAT16);
    assert_eq!(table.start_lba, 63);
    assert_eq!(table.sector_count, 812 * 2 * 63 - 63);
    assert_eq!(table.geometry(), Geometry::new(812, 2, 63));

    let bpb = Bpb::parse(&Sector::read_from(&img, table.start_lba as u64).unwrap()).unwrap();
    assert_eq!(bpb.total_sectors, table.sector_count);
    assert_eq!(bpb.hidden_sectors, 63);
    assert_eq!(bpb.drive_number, 0x80);
    assert_eq!(bpb.media, 0xF8);
    assert_eq!(bpb.sectors_per_cluster, 2);
    assert_eq!(bpb.fat_type, Some(FatType::Fat16));
    assert_eq!(&bpb.volume_label, b"work       ");

    let root = 63 + 1 + 2 * bpb.fat_size as u64;
    let label = root_entry(&img, root).unwrap();
    assert!(label.is_volume_label());
    assert_eq!(&label.raw_name, b"work       ");
}

#[test]
fn small_disk_partition_type_follows_fat() {
    let img = render(&request("hd_st225"), 0);
    let table = PartitionEntry::decode(&Sector::read_from(&img, 0).unwrap());
    assert_eq!(table.partition_type, mbr::TYPE_FAT16_SMALL);

    let mut req = request("hd_st225");
    req.fs.fat_type = Some(12);
    let img = render(&req, 0);
    let table = PartitionEntry::decode(&Sector::read_from(&img, 0).unwrap());
    assert_eq!(table.partition_type, mbr::TYPE_FAT12);
    let bpb = Bpb::parse(&Sector::read_from(&img, 17).unwrap()).unwrap();
    assert_eq!(bpb.fat_type, Some(FatType::Fat12));
    assert_eq!(bpb.sectors_per_cluster, 16);
    assert_eq!(bpb.fat_size, 8);
}

#[test]
fn create_file_writes_image() {
    let path = temp_path("fd_720.img");
    let p = plan(&request("fd_720")).unwrap();
    create_file(&path, &p.image).unwrap();

    let img = fs::read(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(img.len(), 80 * 2 * 9 * SECTOR_SIZE);
    let bpb = Bpb::parse(&Sector::read_from(&img, 0).unwrap()).unwrap();
    assert_eq!(bpb.media, 0xF9);
}

#[test]
fn create_file_reports_unopenable_path() {
    let path = temp_path("missing-dir").join("disk.img");
    let p = plan(&request("fd")).unwrap();
    let err = create_file(&path, &p.image).unwrap_err();
    assert!(matches!(err, Error::Create { .. }));
    assert_eq!(err.code(), ErrorCode::FileError);
    assert!(!path.exists());
}

#[test]
fn planning_errors_carry_exit_codes() {
    let code = |req: ImageRequest| plan(&req).unwrap_err().code().as_u8();

    assert_eq!(code(request("zip")), 8);
    assert_eq!(code(request("hd")), 8);

    let mut req = request("hd");
    req.size_mib = Some(2);
    assert_eq!(code(req), 6);

    let mut req = request("hd");
    req.chs = Some((1024, 16, 63));
    assert_eq!(code(req), 7);

    let mut req = request("hd_520");
    req.fs.fat_type = Some(12);
    assert_eq!(code(req), 2);

    let mut req = request("fd");
    req.fs.fat_copies = Some(0);
    assert_eq!(code(req), 3);

    let mut req = request("fd");
    req.fs.sectors_per_cluster = Some(3);
    assert_eq!(code(req), 4);

    let mut req = request("fd");
    req.fs.root_entries = Some(4097);
    assert_eq!(code(req), 5);

    let mut req = request("fd");
    req.fs.fat_type = Some(16);
    assert_eq!(code(req), 11);
}

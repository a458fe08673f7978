mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tinyfs::{BLOCK_SIZE, BlockId, DescriptorKind, Error, Fd, StatKind};

use common::{fresh, get, pool, put};

const POOL_LEN: usize = 8000;

#[test]
fn round_trip_with_offset_in_descriptor_and_map() {
    let (_, mut fs) = fresh();
    let data = pool(POOL_LEN, 1);

    for offset in [
        0, 512, 2000, 4200, 123, 756, 1234, 6723, 5432, 1452, 529, 4318, 4406, 2832, 3279,
    ] {
        let name = format!("test{offset}");
        put(&mut fs, &name, POOL_LEN as u16, offset, &data[offset..]);
        assert_eq!(
            get(&mut fs, &name, offset, POOL_LEN - offset),
            &data[offset..],
            "offset {offset}"
        );
    }
}

#[test]
fn write_then_read_without_reopening() {
    let (_, mut fs) = fresh();
    let data = pool(913, 2);

    fs.create_file("test").unwrap();
    fs.truncate("test", 597 + 913).unwrap();
    let fd = fs.open("test").unwrap();
    fs.write(fd, 597, &data).unwrap();
    assert_eq!(fs.read(fd, 597, 913).unwrap(), data);
    // 跨过块边界的一小段
    assert_eq!(
        fs.read(fd, 2 * BLOCK_SIZE - 10, 20).unwrap(),
        &data[2 * BLOCK_SIZE - 10 - 597..2 * BLOCK_SIZE + 10 - 597]
    );
}

#[test]
fn link_then_unlink_original_keeps_content() {
    let (_, mut fs) = fresh();
    let data = pool(4200, 3);

    fs.create_file("a").unwrap();
    fs.truncate("a", 4200).unwrap();
    let fd = fs.open("a").unwrap();
    fs.write(fd, 0, &data).unwrap();
    fs.close(fd).unwrap();

    assert_eq!(get(&mut fs, "a", 0, 4200), data);

    fs.link("a", "b").unwrap();
    fs.unlink("a").unwrap();
    assert_eq!(fs.lookup("a"), Err(Error::NotFound));
    assert_eq!(get(&mut fs, "b", 0, 4200), data);
}

#[test]
fn multiple_files_from_shared_pool() {
    let (_, mut fs) = fresh();
    let data = pool(POOL_LEN, 4);
    let mut rng = StdRng::seed_from_u64(10);

    let files: Vec<_> = (0..10)
        .map(|i| {
            let offset = rng.gen_range(0..4000);
            let len = rng.gen_range(0..4000);
            (format!("file-{i}"), offset, len)
        })
        .collect();

    for (name, offset, len) in &files {
        put(
            &mut fs,
            name,
            (offset + len) as u16,
            *offset,
            &data[*offset..offset + len],
        );
    }
    for (name, offset, len) in &files {
        assert_eq!(
            get(&mut fs, name, *offset, *len),
            &data[*offset..offset + len],
            "{name}"
        );
    }
}

#[test]
fn holes_read_as_zeros() {
    let (_, mut fs) = fresh();
    fs.create_file("sparse").unwrap();
    fs.truncate("sparse", 3000).unwrap();

    let fd = fs.open("sparse").unwrap();
    fs.write(fd, 2000, b"0123456789").unwrap();

    let bytes = fs.read(fd, 0, 3000).unwrap();
    assert!(bytes[..2000].iter().all(|&b| b == 0));
    assert_eq!(&bytes[2000..2010], b"0123456789");
    assert!(bytes[2010..].iter().all(|&b| b == 0));

    // 只有被写到的第 3 个块位置分配了数据块
    let id = fs.lookup("sparse").unwrap();
    let blocks = fs.data_blocks(id).unwrap();
    assert_eq!(blocks.len(), 6);
    for (position, block) in blocks.iter().enumerate() {
        assert_eq!(block.is_null(), position != 3, "position {position}");
    }
    assert_eq!(fs.map_blocks(id).unwrap().len(), 1);
}

#[test]
fn range_checks() {
    let (_, mut fs) = fresh();
    fs.create_file("f").unwrap();
    fs.truncate("f", 100).unwrap();
    let fd = fs.open("f").unwrap();

    assert_eq!(fs.read(fd, 90, 11), Err(Error::InvalidRange));
    assert_eq!(fs.read(fd, usize::MAX, 2), Err(Error::InvalidRange));
    assert_eq!(fs.write(fd, 99, b"ab"), Err(Error::FileTooSmall));
    assert_eq!(fs.read(fd, 100, 0).unwrap(), Vec::<u8>::new());
    fs.write(fd, 100, b"").unwrap();

    fs.create_file("empty").unwrap();
    let empty = fs.open("empty").unwrap();
    assert!(fs.read(empty, 0, 0).unwrap().is_empty());
    assert_eq!(fs.read(empty, 0, 1), Err(Error::InvalidRange));
}

#[test]
fn handles_are_checked() {
    let (_, mut fs) = fresh();
    fs.create_file("f").unwrap();
    let fd = fs.open("f").unwrap();
    assert_eq!(u32::from(fd), 1);

    fs.close(fd).unwrap();
    assert_eq!(fs.close(fd), Err(Error::NotOpen));
    assert_eq!(fs.read(fd, 0, 0), Err(Error::NotOpen));
    assert_eq!(fs.write(Fd::from(42), 0, b"x"), Err(Error::NotOpen));
    assert_eq!(fs.open("missing"), Err(Error::NotFound));
}

#[test]
fn writing_a_directory_is_refused() {
    let (_, mut fs) = fresh();
    fs.make_directory("dir").unwrap();
    let fd = fs.open("dir").unwrap();
    assert_eq!(fs.write(fd, 0, b""), Err(Error::IsADirectory));
    assert_eq!(fs.fstat(fd).unwrap().kind, StatKind::DIR);
}

#[test]
fn fstat_counts_occupied_blocks() {
    let (_, mut fs) = fresh();
    let data = pool(913, 5);
    put(&mut fs, "test", 597 + 913, 597, &data);

    let descriptor = fs.stat(1).unwrap();
    assert_eq!(descriptor.id, 1);
    assert_eq!(descriptor.refcount, 1);
    assert_eq!(descriptor.kind, DescriptorKind::File);
    assert_eq!(descriptor.size, 597 + 913);
    assert_eq!(descriptor.map_head, BlockId::NULL);

    let fd = fs.open("test").unwrap();
    let stat = fs.fstat(fd).unwrap();
    assert_eq!(stat.kind, StatKind::FILE);
    assert_eq!(stat.links, 1);
    // 第 0 个块位置从未写过
    assert_eq!(stat.blocks, 2);
}

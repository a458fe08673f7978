mod common;

use std::collections::BTreeSet;

use tinyfs::{BLOCK_SIZE, BLOCKS_COUNT, Error, ROOT_DESCRIPTOR};

use common::{fresh, fresh_with, get, names, put};

#[test]
fn ls_keeps_creation_order() {
    let (_, mut fs) = fresh();
    fs.create_file("file1").unwrap();
    fs.create_file("file2").unwrap();

    let entries = fs.list_directory().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name(), "file1");
    assert_eq!(entries[1].name(), "file2");
    assert!(entries.iter().all(|entry| entry.is_valid()));
}

#[test]
fn freed_slot_is_reused_before_growing() {
    let (_, mut fs) = fresh();
    for name in ["a", "b", "c"] {
        fs.create_file(name).unwrap();
    }
    fs.unlink("b").unwrap();
    fs.create_file("d").unwrap();
    assert_eq!(names(&fs, ""), ["a", "d", "c"]);

    fs.unlink("a").unwrap();
    fs.link("c", "e").unwrap();
    assert_eq!(names(&fs, "/"), ["e", "d", "c"]);

    let root = fs.stat(ROOT_DESCRIPTOR).unwrap();
    assert_eq!(root.size as usize, BLOCK_SIZE);
}

#[test]
fn listing_never_repeats_a_name() {
    let (_, mut fs) = fresh();
    fs.create_file("same").unwrap();
    assert_eq!(fs.create_file("same"), Err(Error::AlreadyExists));
    assert_eq!(fs.make_directory("same"), Err(Error::AlreadyExists));

    fs.unlink("same").unwrap();
    fs.create_file("same").unwrap();
    assert_eq!(names(&fs, ""), ["same"]);
    // 失败的创建没有占用描述符
    assert_eq!(fs.statfs().unwrap().free_descriptors, 98);
}

#[test]
fn directory_grows_into_the_map_chain() {
    let (_, mut fs) = fresh_with(200);
    let slots = BLOCK_SIZE / 16;
    let count = 3 * slots + 5;
    for i in 0..count {
        fs.create_file(&format!("f{i}")).unwrap();
    }

    let root = fs.stat(ROOT_DESCRIPTOR).unwrap();
    assert_eq!(root.size as usize, 4 * BLOCK_SIZE);
    assert_eq!(fs.map_blocks(ROOT_DESCRIPTOR).unwrap().len(), 1);

    let listed: BTreeSet<String> = names(&fs, "").into_iter().collect();
    assert_eq!(listed.len(), count);
    for i in 0..count {
        let name = format!("f{i}");
        assert!(listed.contains(&name));
        assert!(fs.lookup(&name).is_ok());
    }

    // 清空后大小不回退，槽位原地复用
    for i in 0..count {
        fs.unlink(&format!("f{i}")).unwrap();
    }
    assert!(fs.list_directory().unwrap().is_empty());
    fs.create_file("again").unwrap();
    assert_eq!(
        fs.stat(ROOT_DESCRIPTOR).unwrap().size as usize,
        4 * BLOCK_SIZE
    );
}

#[test]
fn descriptor_table_exhaustion() {
    let (_, mut fs) = fresh_with(3);
    fs.create_file("one").unwrap();
    fs.create_file("two").unwrap();
    assert_eq!(fs.create_file("three"), Err(Error::NoFreeDescriptor));
    assert_eq!(names(&fs, ""), ["one", "two"]);
}

#[test]
fn names_are_limited() {
    let (_, mut fs) = fresh();
    assert_eq!(fs.create_file("fourteen-chars"), Err(Error::NameTooLong));
    assert_eq!(fs.create_file("/"), Err(Error::NameTooLong));
    fs.create_file("thirteen-char").unwrap();
    assert_eq!(names(&fs, ""), ["thirteen-char"]);
    assert_eq!(fs.statfs().unwrap().free_descriptors, 98);
}

#[test]
fn nested_directories() {
    let (_, mut fs) = fresh();
    fs.make_directory("docs").unwrap();
    fs.make_directory("docs/old").unwrap();
    put(&mut fs, "docs/old/a.txt", 5, 0, b"hello");

    assert_eq!(names(&fs, "docs"), ["old"]);
    assert_eq!(names(&fs, "/docs/old/"), ["a.txt"]);
    assert_eq!(get(&mut fs, "/docs/old/a.txt", 0, 5), b"hello");

    assert_eq!(fs.create_file("docs/old/a.txt/x"), Err(Error::NotADirectory));
    assert_eq!(fs.list("docs/old/a.txt"), Err(Error::NotADirectory));
    assert_eq!(fs.create_file("docs/new/x"), Err(Error::NotFound));
    assert_eq!(fs.remove_directory("docs"), Err(Error::DirectoryNotEmpty));
    assert_eq!(fs.remove_directory("docs/old/a.txt"), Err(Error::NotADirectory));

    fs.link("docs/old/a.txt", "top").unwrap();
    fs.unlink("docs/old/a.txt").unwrap();
    fs.remove_directory("docs/old").unwrap();
    fs.remove_directory("docs").unwrap();
    assert_eq!(fs.lookup("docs"), Err(Error::NotFound));
    assert_eq!(get(&mut fs, "top", 0, 5), b"hello");

    fs.unlink("top").unwrap();
    let statfs = fs.statfs().unwrap();
    assert_eq!(statfs.free_descriptors, 99);
    // 只剩根目录的一个块
    assert_eq!(statfs.free_blocks, BLOCKS_COUNT - 2);
}

#[test]
fn root_cannot_be_removed() {
    let (_, mut fs) = fresh();
    assert_eq!(fs.remove_directory("/"), Err(Error::NotFound));
    assert_eq!(fs.remove_directory(""), Err(Error::NotFound));
    assert_eq!(fs.unlink("/"), Err(Error::NotFound));
}

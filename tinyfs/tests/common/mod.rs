#![allow(dead_code)]

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tinyfs::{RamStore, TinyFs};

pub const DESCRIPTORS: u16 = 100;

pub fn fresh() -> (Arc<RamStore>, TinyFs) {
    fresh_with(DESCRIPTORS)
}

pub fn fresh_with(descriptors: u16) -> (Arc<RamStore>, TinyFs) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(RamStore::new());
    let fs = TinyFs::format(store.clone(), descriptors).unwrap();
    (store, fs)
}

/// 固定种子的随机字节，充当写入的数据源
pub fn pool(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.r#gen::<u8>()).collect()
}

/// 创建文件、扩到 `size`，在 `offset` 处写入 `data`
pub fn put(fs: &mut TinyFs, name: &str, size: u16, offset: usize, data: &[u8]) {
    fs.create_file(name).unwrap();
    fs.truncate(name, size).unwrap();
    let fd = fs.open(name).unwrap();
    fs.write(fd, offset, data).unwrap();
    fs.close(fd).unwrap();
}

pub fn get(fs: &mut TinyFs, name: &str, offset: usize, size: usize) -> Vec<u8> {
    let fd = fs.open(name).unwrap();
    let bytes = fs.read(fd, offset, size).unwrap();
    fs.close(fd).unwrap();
    bytes
}

pub fn names(fs: &TinyFs, path: &str) -> Vec<String> {
    fs.list(path)
        .unwrap()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect()
}

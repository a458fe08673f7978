#![no_std]

extern crate alloc;

/* tinyfs 的整体架构，自上而下 */

// 文件层：文件创建、打开、读写、链接，以及进程内的打开文件表
mod vfs;
mod fd_table;

// 目录层：目录项的查找、增删与扩容
mod directory;

// 索引链层：描述符直接块之外的间接块链表
mod file_map;

// 磁盘管理器层：描述符表、位图与数据块的定位
mod disk;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
mod layout;

// 记录编解码层：定长记录与字节的互转
mod record;

// 字节存储接口层：随机读写后端文件的接口
mod store;

mod error;

pub use self::{
    error::{Error, Result},
    fd_table::Fd,
    layout::{BlockId, Descriptor, DescriptorKind, DirEntry},
    record::Record,
    store::{ByteStore, RamStore},
    vfs::{FsStat, Stat, StatKind, TinyFs},
};

/// 描述符编号
pub type DescriptorId = u16;

pub const BLOCK_SIZE: usize = 512;
/// 数据区的块数
pub const BLOCKS_COUNT: usize = 2048;
/// 描述符内直接块的个数
pub const DIRECT_BLOCKS: usize = 3;
/// 一个索引块能容纳的块编号个数，末尾两字节留给 `next_map`
pub const REFS_IN_FILE_MAP: usize = (BLOCK_SIZE - 2) / 2;
/// 目录项名字的字节数
pub const NAME_LEN: usize = 13;

pub const ROOT_DESCRIPTOR: DescriptorId = 0;
/// 描述符个数必须严格小于它
pub const NULL_DESCRIPTOR: DescriptorId = u16::MAX;

/// 位图中表示“空闲”的位值
pub const BITMAP_FREE_BIT: bool = true;
/// 位图每次扫描的字节数
pub const BITMAP_WINDOW: usize = 16;

/// 头部区域：偏移 0 处记录描述符个数
pub const DESCRIPTOR_COUNT_OFFSET: usize = 0;
pub const BITMAP_OFFSET: usize = 16;
pub const BITMAP_BYTES: usize = BLOCKS_COUNT / 8;
pub const DESCRIPTORS_OFFSET: usize = BITMAP_OFFSET + BITMAP_BYTES;

type DataBlock = [u8; BLOCK_SIZE];

//! # 磁盘数据结构层
//!
//! tinyfs 的磁盘布局（字节偏移）：
//! 头部 | 块位图 | 描述符表 | 数据块区域
//!
//! 数据块区域的起点取决于格式化时确定的描述符个数，挂载时算一次即可。

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod descriptor;
pub use descriptor::{Descriptor, DescriptorKind};

mod file_map;
pub use file_map::FileMap;

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::DirEntry;

use binrw::binrw;
use derive_more::{From, Into};

/// 块编号，0 号块保留为空指针
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, From, Into)]
#[repr(transparent)]
pub struct BlockId(u16);

impl BlockId {
    pub const NULL: Self = Self(0);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for BlockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//! 描述符（索引节点）
//!
//! 前 [`DIRECT_BLOCKS`] 个数据块的编号直接存在描述符里，
//! 之后的编号存在以 `map_head` 开头的索引块链表中。
//!
//! 数据块在第一次写入时才分配，因此块位置上可能是 [`BlockId::NULL`]（空洞）；
//! 索引块则在 truncate 扩容时就分配好。

use binrw::binrw;

use super::BlockId;
use crate::{BLOCK_SIZE, DIRECT_BLOCKS, DescriptorId, REFS_IN_FILE_MAP, Record};

#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub id: DescriptorId,
    pub kind: DescriptorKind,
    /// 字节数
    pub size: u16,
    /// 硬链接个数
    pub refcount: u8,
    /// 直接块，覆盖前 DIRECT_BLOCKS * BLOCK_SIZE 字节
    pub direct: [BlockId; DIRECT_BLOCKS],
    /// 第一个索引块
    pub map_head: BlockId,
}

#[binrw]
#[brw(repr = u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    #[default]
    Unused = 0,
    File = 1,
    Directory = 2,
    /// 只占位，没有操作会创建它
    Symlink = 3,
}

impl Descriptor {
    #[inline]
    pub fn new(id: DescriptorId, kind: DescriptorKind) -> Self {
        Self {
            id,
            kind,
            refcount: 1,
            ..Default::default()
        }
    }

    /// 空闲槽位
    #[inline]
    pub fn unused(id: DescriptorId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == DescriptorKind::Directory
    }

    #[inline]
    pub fn is_unused(&self) -> bool {
        self.kind == DescriptorKind::Unused
    }

    /// 当前大小对应的块位置个数
    #[inline]
    pub fn block_count(&self) -> usize {
        Self::count_blocks(self.size as usize)
    }

    /// 容纳 `size` 字节需要多少个块位置
    #[inline]
    pub fn count_blocks(size: usize) -> usize {
        size.div_ceil(BLOCK_SIZE)
    }

    /// `blocks` 个块位置需要多少个索引块
    #[inline]
    pub fn count_maps(blocks: usize) -> usize {
        blocks.saturating_sub(DIRECT_BLOCKS).div_ceil(REFS_IN_FILE_MAP)
    }
}

impl Record for Descriptor {
    const SIZE: usize = 2 + 1 + 2 + 1 + 2 * DIRECT_BLOCKS + 2;
}

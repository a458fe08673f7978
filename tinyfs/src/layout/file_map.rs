use binrw::binrw;

use super::BlockId;
use crate::{BLOCK_SIZE, REFS_IN_FILE_MAP, Record};

/// 索引块：整块存放块编号，末尾指向链表中的下一个索引块
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMap {
    pub indexes: [BlockId; REFS_IN_FILE_MAP],
    /// 为 NULL 时链表结束
    pub next_map: BlockId,
}

impl FileMap {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            indexes: [BlockId::NULL; REFS_IN_FILE_MAP],
            next_map: BlockId::NULL,
        }
    }
}

impl Record for FileMap {
    const SIZE: usize = BLOCK_SIZE;
}

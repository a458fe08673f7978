//! # 打开文件表
//!
//! 只存在于一次挂载的内存中，重新挂载后为空。

use alloc::collections::BTreeMap;
use core::fmt;

use derive_more::{From, Into};

use crate::{DescriptorId, Error, Result};

/// 打开文件的句柄，从 1 开始单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct Fd(u32);

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd{}", self.0)
    }
}

#[derive(Debug)]
pub struct FdTable {
    next: u32,
    open: BTreeMap<Fd, DescriptorId>,
}

impl Default for FdTable {
    fn default() -> Self {
        Self {
            next: 1,
            open: BTreeMap::new(),
        }
    }
}

impl FdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor_id: DescriptorId) -> Fd {
        let fd = Fd(self.next);
        self.next += 1;
        self.open.insert(fd, descriptor_id);
        fd
    }

    pub fn get(&self, fd: Fd) -> Result<DescriptorId> {
        self.open.get(&fd).copied().ok_or(Error::NotOpen)
    }

    pub fn remove(&mut self, fd: Fd) -> Result<DescriptorId> {
        self.open.remove(&fd).ok_or(Error::NotOpen)
    }

    /// 是否还有句柄引用该描述符
    pub fn is_open(&self, descriptor_id: DescriptorId) -> bool {
        self.open.values().any(|&id| id == descriptor_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.open.len()
    }
}

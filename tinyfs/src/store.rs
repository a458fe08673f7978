//! # 字节存储接口层
//!
//! 整个文件系统装在一个宿主文件里，[`ByteStore`] 就是对随机读写这个文件的抽象；
//! 实现了此特质的类型称为**后端**。
//!
//! `tinyfs` 只通过后端读写字节，不关心数据最终落在哪里。

use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{Error, Result};

/// 字节存储特质
pub trait ByteStore: Send + Sync {
    /// 从 `offset` 起读满 `buf`
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<()>;
    /// 从 `offset` 起写入整个 `buf`，必要时延长后端
    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<()>;
}

/// 内存后端，测试和临时卷使用
#[derive(Debug, Default)]
pub struct RamStore {
    bytes: Mutex<Vec<u8>>,
}

impl RamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: Mutex::new(vec![0; len]),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteStore for RamStore {
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let bytes = self.bytes.lock();
        let src = bytes.get(offset..offset + buf.len()).ok_or(Error::Io)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<()> {
        let mut bytes = self.bytes.lock();
        let end = offset + buf.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[offset..end].copy_from_slice(buf);
        Ok(())
    }
}

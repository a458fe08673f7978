use alloc::vec;

use super::BlockId;
use crate::{BITMAP_FREE_BIT, BITMAP_WINDOW, ByteStore, Error, Result};

/// 全为已分配时的字节
const USED_BYTE: u8 = if BITMAP_FREE_BIT { 0x00 } else { 0xff };

/// 位图区域，每一位记录一个数据块是否空闲；字节内低位在前
#[derive(Debug)]
pub struct Bitmap {
    /// 位图在后端中的起始字节
    offset: usize,
    /// 位图所指示的块数
    blocks: usize,
}

impl Bitmap {
    #[inline]
    pub const fn new(offset: usize, blocks: usize) -> Self {
        Self { offset, blocks }
    }

    /// 格式化：全部空闲，只保留空块
    pub fn init(&self, store: &dyn ByteStore) -> Result<()> {
        let mut bytes = vec![!USED_BYTE; self.blocks.div_ceil(8)];
        // 空块永远不能分配
        bytes[0] = flip(bytes[0], 0, false);
        store.write_at(self.offset, &bytes)
    }

    /// 以窗口为单位从头扫描，占用第一个空闲块并返回其编号
    pub fn find_and_reserve(&self, store: &dyn ByteStore) -> Result<BlockId> {
        let total_bytes = self.blocks.div_ceil(8);
        let mut window = [0u8; BITMAP_WINDOW];

        for start in (0..total_bytes).step_by(BITMAP_WINDOW) {
            let len = BITMAP_WINDOW.min(total_bytes - start);
            let window = &mut window[..len];
            store.read_at(self.offset + start, window)?;

            let Some((byte_index, bit)) = window.iter().enumerate().find_map(|(i, &byte)| {
                (byte != USED_BYTE).then_some((i, first_free_bit(byte)))
            }) else {
                continue;
            };

            let index = (start + byte_index) * 8 + bit;
            if index >= self.blocks {
                break;
            }
            if index == BlockId::NULL.index() {
                return Err(Error::InvalidLayout);
            }

            let byte = flip(window[byte_index], bit, false);
            store.write_at(self.offset + start + byte_index, &[byte])?;
            return Ok(BlockId::new(index as u16));
        }

        Err(Error::OutOfSpace)
    }

    /// 占用指定块，不做搜索
    #[allow(dead_code)]
    pub fn reserve(&self, store: &dyn ByteStore, id: BlockId) -> Result<()> {
        self.set(store, id, false)
    }

    /// 释放指定块
    pub fn free(&self, store: &dyn ByteStore, id: BlockId) -> Result<()> {
        self.set(store, id, true)
    }

    pub fn is_free(&self, store: &dyn ByteStore, id: BlockId) -> Result<bool> {
        let (byte_offset, bit) = self.position(id)?;
        let mut byte = [0];
        store.read_at(byte_offset, &mut byte)?;
        Ok(bit_value(byte[0], bit) == BITMAP_FREE_BIT)
    }

    pub fn count_free(&self, store: &dyn ByteStore) -> Result<usize> {
        let mut bytes = vec![0u8; self.blocks.div_ceil(8)];
        store.read_at(self.offset, &mut bytes)?;
        Ok((0..self.blocks)
            .filter(|&index| bit_value(bytes[index / 8], index % 8) == BITMAP_FREE_BIT)
            .count())
    }
}

impl Bitmap {
    /// 返回块所在的字节偏移与字节内位置
    fn position(&self, id: BlockId) -> Result<(usize, usize)> {
        let index = id.index();
        if index >= self.blocks {
            return Err(Error::OutOfRange);
        }
        Ok((self.offset + index / 8, index % 8))
    }

    fn set(&self, store: &dyn ByteStore, id: BlockId, free: bool) -> Result<()> {
        if id.is_null() {
            return Err(Error::InvalidLayout);
        }
        let (byte_offset, bit) = self.position(id)?;
        let mut byte = [0];
        store.read_at(byte_offset, &mut byte)?;

        // 重复释放或重复占用都说明块的归属已经乱了
        if (bit_value(byte[0], bit) == BITMAP_FREE_BIT) == free {
            log::error!("block {id} is already {}", if free { "free" } else { "reserved" });
            return Err(Error::InvalidLayout);
        }

        store.write_at(byte_offset, &[flip(byte[0], bit, free)])
    }
}

#[inline]
fn bit_value(byte: u8, bit: usize) -> bool {
    byte & (1 << bit) != 0
}

/// 把 `bit` 设为表示 `free` 的值
#[inline]
fn flip(byte: u8, bit: usize, free: bool) -> u8 {
    if free == BITMAP_FREE_BIT {
        byte | (1 << bit)
    } else {
        byte & !(1 << bit)
    }
}

#[inline]
fn first_free_bit(byte: u8) -> usize {
    if BITMAP_FREE_BIT {
        byte.trailing_zeros() as usize
    } else {
        byte.trailing_ones() as usize
    }
}

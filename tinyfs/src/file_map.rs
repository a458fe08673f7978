//! # 索引链层
//!
//! 描述符只能直接记录 [`DIRECT_BLOCKS`] 个块编号，其余编号依次存放在索引块链表里：
//! 第 `p` 个块位置（`p >= DIRECT_BLOCKS`）位于第 `(p - DIRECT_BLOCKS) / REFS_IN_FILE_MAP`
//! 个索引块的第 `(p - DIRECT_BLOCKS) % REFS_IN_FILE_MAP` 项。
//!
//! 链表只能从头顺序访问，定位第 n 个索引块的代价是 O(n)。
//! 本层从不为写入分配索引块，链表的长度只由 truncate 调整。

use alloc::vec::Vec;
use core::ops::Range;

use crate::disk::Disk;
use crate::layout::{BlockId, Descriptor, FileMap};
use crate::{BLOCKS_COUNT, DIRECT_BLOCKS, Error, REFS_IN_FILE_MAP, Result};

/// 从 `map_head` 起沿 `next_map` 走 `n` 步
pub fn nth_map_block(disk: &Disk, descriptor: &Descriptor, n: usize) -> Result<BlockId> {
    let mut map_id = descriptor.map_head;
    for _ in 0..n {
        if map_id.is_null() {
            return Err(Error::InvalidLayout);
        }
        map_id = disk.file_map(map_id)?.next_map;
    }

    if map_id.is_null() {
        return Err(Error::InvalidLayout);
    }
    Ok(map_id)
}

/// 从索引块 `map_id` 的第 `offset` 项起读出 `count` 个块编号，不够时顺着链表继续读
pub fn read_n_refs(
    disk: &Disk,
    map_id: BlockId,
    offset: usize,
    count: usize,
) -> Result<Vec<BlockId>> {
    if offset > REFS_IN_FILE_MAP {
        return Err(Error::InvalidOffset);
    }

    let mut refs = Vec::with_capacity(count);
    let mut map_id = map_id;
    let mut offset = offset;
    while refs.len() < count {
        if map_id.is_null() {
            return Err(Error::InvalidLayout);
        }
        let file_map = disk.file_map(map_id)?;
        let take = (REFS_IN_FILE_MAP - offset).min(count - refs.len());
        refs.extend_from_slice(&file_map.indexes[offset..offset + take]);

        offset = 0;
        map_id = file_map.next_map;
    }

    Ok(refs)
}

/// 与 [`read_n_refs`] 对称的写入，链表不够长时报错
pub fn write_n_refs(disk: &Disk, map_id: BlockId, offset: usize, values: &[BlockId]) -> Result<()> {
    if offset > REFS_IN_FILE_MAP {
        return Err(Error::InvalidOffset);
    }

    let mut written = 0;
    let mut map_id = map_id;
    let mut offset = offset;
    while written < values.len() {
        if map_id.is_null() {
            return Err(Error::InvalidLayout);
        }
        let mut file_map = disk.file_map(map_id)?;
        let take = (REFS_IN_FILE_MAP - offset).min(values.len() - written);
        if take > 0 {
            file_map.indexes[offset..offset + take]
                .copy_from_slice(&values[written..written + take]);
            disk.set_file_map(map_id, &file_map)?;
        }

        written += take;
        offset = 0;
        map_id = file_map.next_map;
    }

    Ok(())
}

/// 描述符拥有的全部索引块，按链表顺序
pub fn chain(disk: &Disk, descriptor: &Descriptor) -> Result<Vec<BlockId>> {
    let mut maps = Vec::new();
    let mut map_id = descriptor.map_head;
    while !map_id.is_null() {
        // 链表成环
        if maps.len() >= BLOCKS_COUNT {
            return Err(Error::InvalidLayout);
        }
        maps.push(map_id);
        map_id = disk.file_map(map_id)?.next_map;
    }
    Ok(maps)
}

/// 逻辑块位置 `positions` 对应的块编号，空洞为 [`BlockId::NULL`]
pub fn blocks_in(
    disk: &Disk,
    descriptor: &Descriptor,
    positions: Range<usize>,
) -> Result<Vec<BlockId>> {
    if positions.end > descriptor.block_count() {
        return Err(Error::OutOfRange);
    }
    if positions.is_empty() {
        return Ok(Vec::new());
    }

    let mut blocks = Vec::with_capacity(positions.len());
    let direct_end = positions.end.min(DIRECT_BLOCKS);
    if positions.start < direct_end {
        blocks.extend_from_slice(&descriptor.direct[positions.start..direct_end]);
    }

    if positions.end > DIRECT_BLOCKS {
        let first = positions.start.max(DIRECT_BLOCKS) - DIRECT_BLOCKS;
        let count = positions.end - DIRECT_BLOCKS - first;
        let map_id = nth_map_block(disk, descriptor, first / REFS_IN_FILE_MAP)?;
        blocks.extend(read_n_refs(disk, map_id, first % REFS_IN_FILE_MAP, count)?);
    }

    Ok(blocks)
}

/// 第 `position` 个块位置上的编号
pub fn block_at(disk: &Disk, descriptor: &Descriptor, position: usize) -> Result<BlockId> {
    if position >= descriptor.block_count() {
        return Err(Error::OutOfRange);
    }
    if position < DIRECT_BLOCKS {
        return Ok(descriptor.direct[position]);
    }

    let index = position - DIRECT_BLOCKS;
    let map_id = nth_map_block(disk, descriptor, index / REFS_IN_FILE_MAP)?;
    Ok(read_n_refs(disk, map_id, index % REFS_IN_FILE_MAP, 1)?[0])
}

/// 记录第 `position` 个块位置的新编号。
/// 返回描述符本身（直接块）是否被改动，索引块的改动已直接写回。
pub fn set_block_at(
    disk: &Disk,
    descriptor: &mut Descriptor,
    position: usize,
    block_id: BlockId,
) -> Result<bool> {
    if position >= descriptor.block_count() {
        return Err(Error::OutOfRange);
    }

    if position < DIRECT_BLOCKS {
        descriptor.direct[position] = block_id;
        return Ok(true);
    }

    let index = position - DIRECT_BLOCKS;
    let map_id = nth_map_block(disk, descriptor, index / REFS_IN_FILE_MAP)?;
    write_n_refs(disk, map_id, index % REFS_IN_FILE_MAP, &[block_id])?;
    Ok(false)
}

/// 把链表延长到 `maps` 个索引块，新索引块的编号全为空
pub fn grow_chain(disk: &Disk, descriptor: &mut Descriptor, maps: usize) -> Result<()> {
    let existing = chain(disk, descriptor)?;
    let mut tail = existing.last().copied();

    for _ in existing.len()..maps {
        let map_id = disk.alloc_block()?;
        disk.set_file_map(map_id, &FileMap::empty())?;

        match tail {
            None => descriptor.map_head = map_id,
            Some(tail_id) => {
                let mut tail_map = disk.file_map(tail_id)?;
                tail_map.next_map = map_id;
                disk.set_file_map(tail_id, &tail_map)?;
            }
        }
        tail = Some(map_id);
    }

    Ok(())
}

/// 只保留前 `maps` 个索引块，其余归还位图
pub fn shrink_chain(disk: &Disk, descriptor: &mut Descriptor, maps: usize) -> Result<()> {
    let existing = chain(disk, descriptor)?;
    if existing.len() <= maps {
        return Ok(());
    }

    match maps.checked_sub(1).map(|last| existing[last]) {
        None => descriptor.map_head = BlockId::NULL,
        Some(last_id) => {
            let mut last_map = disk.file_map(last_id)?;
            last_map.next_map = BlockId::NULL;
            disk.set_file_map(last_id, &last_map)?;
        }
    }

    for &map_id in &existing[maps..] {
        disk.dealloc_block(map_id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec;

    use super::*;
    use crate::layout::DescriptorKind;
    use crate::{BLOCK_SIZE, RamStore};

    fn disk() -> Disk {
        Disk::format(Arc::new(RamStore::new()), 4).unwrap()
    }

    #[test]
    fn refs_spill_into_the_next_map() {
        let disk = disk();
        let mut descriptor = Descriptor::new(1, DescriptorKind::File);
        grow_chain(&disk, &mut descriptor, 2).unwrap();
        let maps = chain(&disk, &descriptor).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(descriptor.map_head, maps[0]);

        let values: Vec<_> = (100..104).map(BlockId::new).collect();
        write_n_refs(&disk, maps[0], REFS_IN_FILE_MAP - 2, &values).unwrap();
        assert_eq!(
            read_n_refs(&disk, maps[0], REFS_IN_FILE_MAP - 2, 4).unwrap(),
            values
        );
        assert_eq!(disk.file_map(maps[1]).unwrap().indexes[..2], values[2..]);
        assert_eq!(nth_map_block(&disk, &descriptor, 1).unwrap(), maps[1]);
        assert_eq!(
            nth_map_block(&disk, &descriptor, 2),
            Err(Error::InvalidLayout)
        );
    }

    #[test]
    fn short_chain_is_an_invalid_layout() {
        let disk = disk();
        let mut descriptor = Descriptor::new(1, DescriptorKind::File);
        grow_chain(&disk, &mut descriptor, 1).unwrap();

        let values = vec![BlockId::new(7); 2];
        assert_eq!(
            write_n_refs(&disk, descriptor.map_head, REFS_IN_FILE_MAP - 1, &values),
            Err(Error::InvalidLayout)
        );
        assert_eq!(
            read_n_refs(&disk, descriptor.map_head, REFS_IN_FILE_MAP + 1, 1),
            Err(Error::InvalidOffset)
        );
    }

    #[test]
    fn positions_map_through_direct_slots_then_chain() {
        let disk = disk();
        let mut descriptor = Descriptor::new(1, DescriptorKind::File);
        descriptor.size = (BLOCK_SIZE * (DIRECT_BLOCKS + 2)) as u16;
        grow_chain(&disk, &mut descriptor, 1).unwrap();

        assert!(set_block_at(&disk, &mut descriptor, 1, BlockId::new(20)).unwrap());
        assert!(!set_block_at(&disk, &mut descriptor, DIRECT_BLOCKS + 1, BlockId::new(21)).unwrap());
        assert_eq!(
            blocks_in(&disk, &descriptor, 0..descriptor.block_count()).unwrap(),
            [0, 20, 0, 0, 21].map(BlockId::new)
        );
        assert_eq!(block_at(&disk, &descriptor, 4).unwrap(), BlockId::new(21));
        assert_eq!(
            set_block_at(&disk, &mut descriptor, 5, BlockId::new(22)),
            Err(Error::OutOfRange)
        );

        shrink_chain(&disk, &mut descriptor, 0).unwrap();
        assert_eq!(descriptor.map_head, BlockId::NULL);
    }
}

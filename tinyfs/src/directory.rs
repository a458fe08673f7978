//! # 目录层
//!
//! 目录也是文件，它的数据块（直接块与索引链上的块一样）是连续的目录项数组。
//! 删除目录项只把它标记为无效，槽位留给之后的链接复用；
//! 找不到空槽时目录整块整块地增长。

use alloc::vec::Vec;

use crate::disk::Disk;
use crate::file_map;
use crate::layout::{BlockId, Descriptor, DirEntry};
use crate::{BLOCK_SIZE, DescriptorId, Error, Result};

/// 目录项在磁盘上的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub block: BlockId,
    pub index: usize,
}

/// 目录下的全部有效项
pub fn list(disk: &Disk, dir_id: DescriptorId) -> Result<Vec<DirEntry>> {
    let dir = directory(disk, dir_id)?;
    let mut entries = Vec::new();
    for block in blocks(disk, &dir)? {
        entries.extend(
            disk.dir_entries(block)?
                .into_iter()
                .filter(DirEntry::is_valid),
        );
    }
    Ok(entries)
}

/// 先直接块、后索引链，返回第一个同名的有效项
pub fn find(disk: &Disk, dir_id: DescriptorId, name: &str) -> Result<Option<DirEntry>> {
    let dir = directory(disk, dir_id)?;
    Ok(locate(disk, &dir, |entry| entry.matches(name))?.map(|(_, entry)| entry))
}

/// 寻找无效槽位；找不到就为目录追加一个清零的新块
pub fn find_free_slot(disk: &Disk, dir_id: DescriptorId) -> Result<Slot> {
    let dir = directory(disk, dir_id)?;
    match locate(disk, &dir, |entry| !entry.is_valid())? {
        Some((slot, _)) => Ok(slot),
        None => grow(disk, dir),
    }
}

pub fn add_link(
    disk: &Disk,
    dir_id: DescriptorId,
    name: &str,
    descriptor_id: DescriptorId,
) -> Result<()> {
    let entry = DirEntry::new(name, descriptor_id)?;
    let dir = directory(disk, dir_id)?;
    if locate(disk, &dir, |existing| existing.matches(name))?.is_some() {
        return Err(Error::AlreadyExists);
    }

    let slot = find_free_slot(disk, dir_id)?;
    log::debug!(
        "link {name:?} -> descriptor {descriptor_id} in directory {dir_id} at {}[{}]",
        slot.block,
        slot.index
    );
    disk.set_dir_entry(slot.block, slot.index, &entry)
}

/// 原地作废同名项并返回它
pub fn remove_link(disk: &Disk, dir_id: DescriptorId, name: &str) -> Result<DirEntry> {
    let dir = directory(disk, dir_id)?;
    let (slot, mut entry) =
        locate(disk, &dir, |entry| entry.matches(name))?.ok_or(Error::NotFound)?;

    entry.invalidate();
    disk.set_dir_entry(slot.block, slot.index, &entry)?;
    log::debug!("unlink {name:?} from directory {dir_id}");
    Ok(entry)
}

pub fn is_empty(disk: &Disk, dir_id: DescriptorId) -> Result<bool> {
    let dir = directory(disk, dir_id)?;
    Ok(locate(disk, &dir, DirEntry::is_valid)?.is_none())
}

/// 读取描述符并确认它是目录
fn directory(disk: &Disk, dir_id: DescriptorId) -> Result<Descriptor> {
    let dir = disk.descriptor(dir_id)?;
    if !dir.is_dir() {
        return Err(Error::NotADirectory);
    }
    Ok(dir)
}

/// 目录的全部数据块；目录从不含空洞
fn blocks(disk: &Disk, dir: &Descriptor) -> Result<Vec<BlockId>> {
    let blocks = file_map::blocks_in(disk, dir, 0..dir.block_count())?;
    if blocks.iter().any(|block| block.is_null()) {
        return Err(Error::InvalidLayout);
    }
    Ok(blocks)
}

fn locate(
    disk: &Disk,
    dir: &Descriptor,
    mut predicate: impl FnMut(&DirEntry) -> bool,
) -> Result<Option<(Slot, DirEntry)>> {
    for block in blocks(disk, dir)? {
        if let Some((index, entry)) = disk
            .dir_entries(block)?
            .into_iter()
            .enumerate()
            .find(|(_, entry)| predicate(entry))
        {
            return Ok(Some((Slot { block, index }, entry)));
        }
    }
    Ok(None)
}

/// 目录增长一整块，新块清零后所有槽位都是无效项
fn grow(disk: &Disk, mut dir: Descriptor) -> Result<Slot> {
    let size = dir.size as usize + BLOCK_SIZE;
    let size = u16::try_from(size).map_err(|_| Error::OutOfSpace)?;

    let block = disk.alloc_block()?;
    let position = dir.block_count();
    dir.size = size;
    // 离开纯直接块寻址时分配第一个索引块
    let maps = Descriptor::count_maps(dir.block_count());
    file_map::grow_chain(disk, &mut dir, maps)?;
    file_map::set_block_at(disk, &mut dir, position, block)?;
    disk.set_descriptor(dir.id, &dir)?;

    log::debug!("directory {} grows to {} bytes", dir.id, dir.size);
    Ok(Slot { block, index: 0 })
}

//! # 文件层
//!
//! 确立了文件系统的操作逻辑：[`TinyFs`] 把“描述符 + 字节偏移 + 长度”形式的请求
//! 翻译成块的分配、索引链的遍历与目录项的增删，并维护本次挂载的打开文件表。
//!
//! 路径以 `/` 分隔，总是从根目录开始解析。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use enumflags2::bitflags;

use crate::directory;
use crate::disk::Disk;
use crate::fd_table::{Fd, FdTable};
use crate::file_map;
use crate::layout::{BlockId, Descriptor, DescriptorKind, DirEntry};
use crate::{
    BLOCK_SIZE, BLOCKS_COUNT, ByteStore, DIRECT_BLOCKS, DescriptorId, Error, REFS_IN_FILE_MAP,
    ROOT_DESCRIPTOR, Result,
};

pub struct TinyFs {
    disk: Disk,
    fd_table: FdTable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub id: DescriptorId,
    pub kind: StatKind,
    pub links: u8,
    pub size: u16,
    /// 占用的块数，包括索引块
    pub blocks: usize,
}

#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    #[default]
    FILE = 0o100000,
}

/// 整个卷的用量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub block_size: usize,
    pub blocks: usize,
    pub free_blocks: usize,
    pub descriptors: usize,
    pub free_descriptors: usize,
    /// 映像文件的字节数
    pub image_len: usize,
}

impl TinyFs {
    /// 在后端上建立一个只有根目录的新卷
    pub fn format(store: Arc<dyn ByteStore>, descriptor_count: u16) -> Result<Self> {
        Ok(Self::new(Disk::format(store, descriptor_count)?))
    }

    pub fn mount(store: Arc<dyn ByteStore>) -> Result<Self> {
        Ok(Self::new(Disk::mount(store)?))
    }

    pub fn create_file(&mut self, path: &str) -> Result<DescriptorId> {
        self.create(path, DescriptorKind::File)
    }

    pub fn make_directory(&mut self, path: &str) -> Result<DescriptorId> {
        self.create(path, DescriptorKind::Directory)
    }

    /// 删除空目录
    pub fn remove_directory(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.lookup_parent(path)?;
        let entry = directory::find(&self.disk, parent, name)?.ok_or(Error::NotFound)?;
        let mut descriptor = self.live_descriptor(entry.descriptor_id())?;
        if !descriptor.is_dir() {
            return Err(Error::NotADirectory);
        }
        if !directory::is_empty(&self.disk, descriptor.id)? {
            return Err(Error::DirectoryNotEmpty);
        }

        directory::remove_link(&self.disk, parent, name)?;
        descriptor.refcount = 0;
        self.disk.set_descriptor(descriptor.id, &descriptor)?;
        self.release(descriptor.id)
    }

    /// 调整文件大小。
    /// 缩小时归还多出的数据块与索引块；扩大时只延长索引链，数据块等到写入时才分配。
    pub fn truncate(&mut self, path: &str, new_size: u16) -> Result<Descriptor> {
        let id = self.lookup(path)?;
        let mut descriptor = self.live_descriptor(id)?;
        if descriptor.is_dir() {
            return Err(Error::IsADirectory);
        }

        let old_size = descriptor.size as usize;
        let new_size_bytes = new_size as usize;
        let old_blocks = descriptor.block_count();
        let new_blocks = Descriptor::count_blocks(new_size_bytes);

        if new_blocks < old_blocks {
            self.release_blocks(&mut descriptor, new_blocks)?;
        } else if new_blocks > old_blocks {
            for slot in descriptor.direct.iter_mut().take(new_blocks).skip(old_blocks) {
                *slot = BlockId::NULL;
            }
            file_map::grow_chain(&self.disk, &mut descriptor, Descriptor::count_maps(new_blocks))?;
        }

        // 最后一个保留块的尾部清零，之后扩大时读到的是零
        let tail = new_size_bytes % BLOCK_SIZE;
        if new_size_bytes < old_size && tail != 0 {
            let block = file_map::block_at(&self.disk, &descriptor, new_blocks - 1)?;
            if !block.is_null() {
                self.disk
                    .write_block(block, tail, &[0; BLOCK_SIZE][..BLOCK_SIZE - tail])?;
            }
        }

        descriptor.size = new_size;
        self.disk.set_descriptor(id, &descriptor)?;
        log::debug!("truncate {path:?} from {old_size} to {new_size} bytes");
        Ok(descriptor)
    }

    pub fn open(&mut self, path: &str) -> Result<Fd> {
        let id = self.lookup(path)?;
        self.live_descriptor(id)?;
        let fd = self.fd_table.insert(id);
        log::debug!("open {path:?} as {fd} -> descriptor {id}");
        Ok(fd)
    }

    /// 关闭句柄；链接数已归零且没有其他句柄时回收描述符
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        let id = self.fd_table.remove(fd)?;
        log::debug!("close {fd}");

        let descriptor = self.disk.descriptor(id)?;
        if !descriptor.is_unused() && descriptor.refcount == 0 && !self.fd_table.is_open(id) {
            self.reclaim(id)?;
        }
        Ok(())
    }

    /// 读出 `[offset, offset + size)`，空洞读出零
    pub fn read(&self, fd: Fd, offset: usize, size: usize) -> Result<Vec<u8>> {
        let descriptor = self.live_descriptor(self.fd_table.get(fd)?)?;
        let end = offset.checked_add(size).ok_or(Error::InvalidRange)?;
        if end > descriptor.size as usize {
            return Err(Error::InvalidRange);
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let positions = offset / BLOCK_SIZE..end.div_ceil(BLOCK_SIZE);
        let mut bytes = Vec::with_capacity(positions.len() * BLOCK_SIZE);
        let mut data_block = [0; BLOCK_SIZE];
        for block in file_map::blocks_in(&self.disk, &descriptor, positions)? {
            if block.is_null() {
                data_block.fill(0);
            } else {
                self.disk.read_block(block, &mut data_block)?;
            }
            bytes.extend_from_slice(&data_block);
        }

        bytes.drain(..offset % BLOCK_SIZE);
        bytes.truncate(size);
        Ok(bytes)
    }

    /// 在已有大小之内覆写，遇到空洞时才分配数据块
    pub fn write(&mut self, fd: Fd, offset: usize, data: &[u8]) -> Result<()> {
        let mut descriptor = self.live_descriptor(self.fd_table.get(fd)?)?;
        if descriptor.is_dir() {
            return Err(Error::IsADirectory);
        }
        let end = offset.checked_add(data.len()).ok_or(Error::FileTooSmall)?;
        if end > descriptor.size as usize {
            return Err(Error::FileTooSmall);
        }
        if data.is_empty() {
            return Ok(());
        }

        let positions = offset / BLOCK_SIZE..end.div_ceil(BLOCK_SIZE);
        let blocks = file_map::blocks_in(&self.disk, &descriptor, positions.clone())?;
        let mut direct_changed = false;
        for (position, block) in positions.zip(blocks) {
            let block = if block.is_null() {
                let block = self.disk.alloc_block()?;
                direct_changed |= file_map::set_block_at(&self.disk, &mut descriptor, position, block)?;
                block
            } else {
                block
            };

            let block_start = position * BLOCK_SIZE;
            let from = offset.max(block_start);
            let to = end.min(block_start + BLOCK_SIZE);
            self.disk
                .write_block(block, from - block_start, &data[from - offset..to - offset])?;
        }

        if direct_changed {
            self.disk.set_descriptor(descriptor.id, &descriptor)?;
        }
        Ok(())
    }

    /// 为已有文件添加硬链接
    pub fn link(&mut self, existing: &str, new_path: &str) -> Result<()> {
        let id = self.lookup(existing)?;
        let mut descriptor = self.live_descriptor(id)?;
        if descriptor.is_dir() {
            return Err(Error::IsADirectory);
        }
        let refcount = descriptor.refcount.checked_add(1).ok_or(Error::TooManyLinks)?;

        let (parent, name) = self.lookup_parent(new_path)?;
        directory::add_link(&self.disk, parent, name, id)?;
        descriptor.refcount = refcount;
        self.disk.set_descriptor(id, &descriptor)
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.lookup_parent(path)?;
        let entry = directory::find(&self.disk, parent, name)?.ok_or(Error::NotFound)?;
        let mut descriptor = self.live_descriptor(entry.descriptor_id())?;
        if descriptor.is_dir() {
            return Err(Error::IsADirectory);
        }

        directory::remove_link(&self.disk, parent, name)?;
        descriptor.refcount = descriptor
            .refcount
            .checked_sub(1)
            .ok_or(Error::InvalidLayout)?;
        self.disk.set_descriptor(descriptor.id, &descriptor)?;

        if descriptor.refcount == 0 {
            self.release(descriptor.id)?;
        }
        Ok(())
    }

    /// 根目录下的有效项
    pub fn list_directory(&self) -> Result<Vec<DirEntry>> {
        directory::list(&self.disk, ROOT_DESCRIPTOR)
    }

    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        directory::list(&self.disk, self.lookup(path)?)
    }

    pub fn stat(&self, id: DescriptorId) -> Result<Descriptor> {
        self.disk.descriptor(id)
    }

    pub fn fstat(&self, fd: Fd) -> Result<Stat> {
        let descriptor = self.live_descriptor(self.fd_table.get(fd)?)?;
        let data_blocks = self
            .data_blocks(descriptor.id)?
            .iter()
            .filter(|block| !block.is_null())
            .count();

        Ok(Stat {
            id: descriptor.id,
            kind: descriptor.kind.into(),
            links: descriptor.refcount,
            size: descriptor.size,
            blocks: data_blocks + self.map_blocks(descriptor.id)?.len(),
        })
    }

    pub fn statfs(&self) -> Result<FsStat> {
        Ok(FsStat {
            block_size: BLOCK_SIZE,
            blocks: BLOCKS_COUNT,
            free_blocks: self.disk.bitmap().count_free(self.disk.store())?,
            descriptors: self.disk.descriptor_count() as usize,
            free_descriptors: self.disk.count_unused()?,
            image_len: self.disk.image_len(),
        })
    }

    /// 从根目录解析路径
    pub fn lookup(&self, path: &str) -> Result<DescriptorId> {
        path.split('/')
            .filter(|name| !name.is_empty())
            .try_fold(ROOT_DESCRIPTOR, |dir_id, name| {
                directory::find(&self.disk, dir_id, name)?
                    .map(|entry| entry.descriptor_id())
                    .ok_or(Error::NotFound)
            })
    }

    /// 各个块位置上的数据块编号，空洞为 [`BlockId::NULL`]
    pub fn data_blocks(&self, id: DescriptorId) -> Result<Vec<BlockId>> {
        let descriptor = self.disk.descriptor(id)?;
        file_map::blocks_in(&self.disk, &descriptor, 0..descriptor.block_count())
    }

    /// 描述符的索引链
    pub fn map_blocks(&self, id: DescriptorId) -> Result<Vec<BlockId>> {
        file_map::chain(&self.disk, &self.disk.descriptor(id)?)
    }

    pub fn is_block_free(&self, id: BlockId) -> Result<bool> {
        self.disk.bitmap().is_free(self.disk.store(), id)
    }

    /// 打开的句柄数
    #[inline]
    pub fn open_files(&self) -> usize {
        self.fd_table.len()
    }
}

impl TinyFs {
    fn new(disk: Disk) -> Self {
        Self {
            disk,
            fd_table: FdTable::new(),
        }
    }

    fn create(&mut self, path: &str, kind: DescriptorKind) -> Result<DescriptorId> {
        let (parent, name) = self.lookup_parent(path)?;
        let id = self.disk.find_first_unused()?;
        self.disk.set_descriptor(id, &Descriptor::new(id, kind))?;

        // 链接失败就把描述符还回去
        if let Err(err) = directory::add_link(&self.disk, parent, name, id) {
            self.disk.set_descriptor(id, &Descriptor::unused(id))?;
            return Err(err);
        }

        log::info!("create {kind:?} {path:?} -> descriptor {id}");
        Ok(id)
    }

    /// 返回父目录与最后一段名字
    fn lookup_parent<'a>(&self, path: &'a str) -> Result<(DescriptorId, &'a str)> {
        let path = path.trim_matches('/');
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
        Ok((self.lookup(parent)?, name))
    }

    /// 空闲描述符不能参与文件操作
    fn live_descriptor(&self, id: DescriptorId) -> Result<Descriptor> {
        let descriptor = self.disk.descriptor(id)?;
        if descriptor.is_unused() {
            return Err(Error::InvalidLayout);
        }
        Ok(descriptor)
    }

    /// 链接数归零后：没有句柄就立即回收，否则等最后一次 close
    fn release(&self, id: DescriptorId) -> Result<()> {
        if self.fd_table.is_open(id) {
            log::warn!("descriptor {id} has no links left but is still open, reclaim deferred");
            return Ok(());
        }
        self.reclaim(id)
    }

    fn reclaim(&self, id: DescriptorId) -> Result<()> {
        let mut descriptor = self.disk.descriptor(id)?;
        self.release_blocks(&mut descriptor, 0)?;
        self.disk.set_descriptor(id, &Descriptor::unused(id))?;
        log::debug!("descriptor {id} reclaimed");
        Ok(())
    }

    /// 只保留前 `keep` 个块位置：归还其后的数据块，在保留的索引块里清空对应位置，
    /// 最后归还多余的索引块。不修改 `size`。
    fn release_blocks(&self, descriptor: &mut Descriptor, keep: usize) -> Result<()> {
        let blocks = descriptor.block_count();
        if keep >= blocks {
            return Ok(());
        }

        for block in file_map::blocks_in(&self.disk, descriptor, keep..blocks)? {
            if !block.is_null() {
                self.disk.dealloc_block(block)?;
            }
        }
        for slot in descriptor.direct.iter_mut().skip(keep) {
            *slot = BlockId::NULL;
        }

        let keep_maps = Descriptor::count_maps(keep);
        let map_start = keep.max(DIRECT_BLOCKS);
        let map_end = blocks.min(DIRECT_BLOCKS + keep_maps * REFS_IN_FILE_MAP);
        if map_start < map_end {
            let index = map_start - DIRECT_BLOCKS;
            let map_id = file_map::nth_map_block(&self.disk, descriptor, index / REFS_IN_FILE_MAP)?;
            file_map::write_n_refs(
                &self.disk,
                map_id,
                index % REFS_IN_FILE_MAP,
                &vec![BlockId::NULL; map_end - map_start],
            )?;
        }

        file_map::shrink_chain(&self.disk, descriptor, keep_maps)
    }
}

impl From<DescriptorKind> for StatKind {
    #[inline]
    fn from(kind: DescriptorKind) -> Self {
        match kind {
            DescriptorKind::Directory => Self::DIR,
            _ => Self::FILE,
        }
    }
}

//! # 磁盘管理器层
//!
//! 构建出后端的布局并使用：描述符表的读写、数据块的定位、块的分配与回收。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::layout::*;
use crate::record::{self, Record};
use crate::{
    BITMAP_OFFSET, BLOCK_SIZE, BLOCKS_COUNT, ByteStore, DESCRIPTOR_COUNT_OFFSET,
    DESCRIPTORS_OFFSET, DataBlock, DescriptorId, Error, NULL_DESCRIPTOR, ROOT_DESCRIPTOR, Result,
};

pub struct Disk {
    store: Arc<dyn ByteStore>,
    bitmap: Bitmap,
    descriptor_count: u16,
    /// 数据块区域的起始字节，挂载时算好后不再变化
    blocks_offset: usize,
}

impl Disk {
    pub fn format(store: Arc<dyn ByteStore>, descriptor_count: u16) -> Result<Self> {
        if descriptor_count == 0 || descriptor_count >= NULL_DESCRIPTOR {
            return Err(Error::OutOfRange);
        }

        record::write(
            store.as_ref(),
            DESCRIPTOR_COUNT_OFFSET,
            &SuperBlock::new(descriptor_count),
        )?;
        let disk = Self::new(store, descriptor_count);
        disk.bitmap.init(disk.store.as_ref())?;

        let table = vec![0; descriptor_count as usize * Descriptor::SIZE];
        disk.store.write_at(DESCRIPTORS_OFFSET, &table)?;
        // 撑满整个映像，之后的读写都不会越过后端末尾
        disk.store.write_at(disk.image_len() - 1, &[0])?;

        disk.set_descriptor(
            ROOT_DESCRIPTOR,
            &Descriptor::new(ROOT_DESCRIPTOR, DescriptorKind::Directory),
        )?;

        log::info!(
            "formatted: {descriptor_count} descriptors, {BLOCKS_COUNT} blocks, {} bytes",
            disk.image_len()
        );
        Ok(disk)
    }

    pub fn mount(store: Arc<dyn ByteStore>) -> Result<Self> {
        let super_block: SuperBlock = record::read(store.as_ref(), DESCRIPTOR_COUNT_OFFSET)?;
        log::info!("mounted: {} descriptors", super_block.descriptor_count);
        Ok(Self::new(store, super_block.descriptor_count))
    }

    #[inline]
    pub fn descriptor_count(&self) -> u16 {
        self.descriptor_count
    }

    /// 映像的总字节数
    #[inline]
    pub fn image_len(&self) -> usize {
        self.blocks_offset + BLOCKS_COUNT * BLOCK_SIZE
    }

    #[inline]
    pub fn store(&self) -> &dyn ByteStore {
        self.store.as_ref()
    }

    #[inline]
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}

/* 描述符表 */
impl Disk {
    pub fn descriptor(&self, id: DescriptorId) -> Result<Descriptor> {
        record::read(self.store(), self.descriptor_pos(id)?)
    }

    pub fn set_descriptor(&self, id: DescriptorId, descriptor: &Descriptor) -> Result<()> {
        debug_assert_eq!(id, descriptor.id);
        record::write(self.store(), self.descriptor_pos(id)?, descriptor)
    }

    /// 线性扫描第一个空闲描述符
    pub fn find_first_unused(&self) -> Result<DescriptorId> {
        let table: Vec<Descriptor> = record::read_many(
            self.store(),
            DESCRIPTORS_OFFSET,
            self.descriptor_count as usize,
        )?;
        table
            .iter()
            .position(Descriptor::is_unused)
            .map(|id| id as DescriptorId)
            .ok_or(Error::NoFreeDescriptor)
    }

    /// 空闲描述符个数
    pub fn count_unused(&self) -> Result<usize> {
        let table: Vec<Descriptor> = record::read_many(
            self.store(),
            DESCRIPTORS_OFFSET,
            self.descriptor_count as usize,
        )?;
        Ok(table.iter().filter(|descriptor| descriptor.is_unused()).count())
    }
}

/* 块的分配与读写 */
impl Disk {
    /// 分配一个新块并清零
    pub fn alloc_block(&self) -> Result<BlockId> {
        let id = self.bitmap.find_and_reserve(self.store())?;
        self.store.write_at(self.block_pos(id)?, &[0; BLOCK_SIZE])?;
        log::trace!("alloc block {id}");
        Ok(id)
    }

    pub fn dealloc_block(&self, id: BlockId) -> Result<()> {
        log::trace!("dealloc block {id}");
        self.bitmap.free(self.store(), id)
    }

    pub fn read_block(&self, id: BlockId, data_block: &mut DataBlock) -> Result<()> {
        self.store.read_at(self.block_pos(id)?, data_block)
    }

    /// 从块内偏移 `offset` 处写入 `buf`
    pub fn write_block(&self, id: BlockId, offset: usize, buf: &[u8]) -> Result<()> {
        if offset + buf.len() > BLOCK_SIZE {
            return Err(Error::InvalidOffset);
        }
        self.store.write_at(self.block_pos(id)? + offset, buf)
    }

    pub fn file_map(&self, id: BlockId) -> Result<FileMap> {
        record::read(self.store(), self.block_pos(id)?)
    }

    pub fn set_file_map(&self, id: BlockId, file_map: &FileMap) -> Result<()> {
        record::write(self.store(), self.block_pos(id)?, file_map)
    }

    /// 读出一个目录块中的全部目录项槽位
    pub fn dir_entries(&self, id: BlockId) -> Result<Vec<DirEntry>> {
        record::read_many(self.store(), self.block_pos(id)?, BLOCK_SIZE / DirEntry::SIZE)
    }

    pub fn set_dir_entry(&self, id: BlockId, slot: usize, entry: &DirEntry) -> Result<()> {
        if slot >= BLOCK_SIZE / DirEntry::SIZE {
            return Err(Error::OutOfRange);
        }
        record::write(self.store(), self.block_pos(id)? + slot * DirEntry::SIZE, entry)
    }
}

impl Disk {
    fn new(store: Arc<dyn ByteStore>, descriptor_count: u16) -> Self {
        Self {
            store,
            bitmap: Bitmap::new(BITMAP_OFFSET, BLOCKS_COUNT),
            descriptor_count,
            blocks_offset: DESCRIPTORS_OFFSET + descriptor_count as usize * Descriptor::SIZE,
        }
    }

    /// 描述符在后端中的字节偏移
    fn descriptor_pos(&self, id: DescriptorId) -> Result<usize> {
        if id >= self.descriptor_count {
            return Err(Error::OutOfRange);
        }
        Ok(DESCRIPTORS_OFFSET + id as usize * Descriptor::SIZE)
    }

    /// 块在后端中的字节偏移，空块不可读写
    fn block_pos(&self, id: BlockId) -> Result<usize> {
        if id.is_null() {
            return Err(Error::InvalidLayout);
        }
        if id.index() >= BLOCKS_COUNT {
            return Err(Error::OutOfRange);
        }
        Ok(self.blocks_offset + id.index() * BLOCK_SIZE)
    }
}

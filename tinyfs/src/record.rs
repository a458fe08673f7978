//! # 记录编解码层
//!
//! 磁盘上的结构都是定长、小端的记录，由 `binrw` 负责与字节互转；
//! 上层只需要“在偏移 O 处读/写类型 T 的记录”。

use alloc::vec;
use alloc::vec::Vec;

use binrw::io::Cursor;
use binrw::meta::{ReadEndian, WriteEndian};
use binrw::{BinRead, BinWrite};

use crate::{ByteStore, Result};

/// 定长磁盘记录
pub trait Record:
    for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()> + ReadEndian + WriteEndian
{
    /// 编码后的字节数，恒定
    const SIZE: usize;
}

pub fn read<T: Record>(store: &dyn ByteStore, offset: usize) -> Result<T> {
    let mut buf = vec![0; T::SIZE];
    store.read_at(offset, &mut buf)?;
    Ok(<T as BinRead>::read(&mut Cursor::new(buf.as_slice()))?)
}

pub fn write<T: Record>(store: &dyn ByteStore, offset: usize, record: &T) -> Result<()> {
    let mut buf = vec![0; T::SIZE];
    BinWrite::write(record, &mut Cursor::new(buf.as_mut_slice()))?;
    store.write_at(offset, &buf)
}

/// 连续读出 `count` 条记录
pub fn read_many<T: Record>(
    store: &dyn ByteStore,
    offset: usize,
    count: usize,
) -> Result<Vec<T>> {
    let mut buf = vec![0; T::SIZE * count];
    store.read_at(offset, &mut buf)?;
    let mut cursor = Cursor::new(buf.as_slice());
    (0..count)
        .map(|_| Ok(<T as BinRead>::read(&mut cursor)?))
        .collect()
}

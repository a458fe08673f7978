use binrw::binrw;

use crate::Record;

/// 超级块：只记录格式化时确定的描述符个数，
/// 其余区域都由它和编译期常量定位。没有魔数，挂载时不做校验。
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub descriptor_count: u16,
}

impl SuperBlock {
    #[inline]
    pub fn new(descriptor_count: u16) -> Self {
        Self { descriptor_count }
    }
}

impl Record for SuperBlock {
    const SIZE: usize = 2;
}

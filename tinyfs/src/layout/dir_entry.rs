use binrw::binrw;

use crate::{DescriptorId, Error, NAME_LEN, Record, Result};

/// 文件系统项的元信息
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    // 不足 NAME_LEN 时以 \0 补齐
    name: [u8; NAME_LEN],
    #[br(map = |valid: u8| valid != 0)]
    #[bw(map = |valid: &bool| u8::from(*valid))]
    is_valid: bool,
    descriptor_id: DescriptorId,
}

impl DirEntry {
    pub fn new(name: &str, descriptor_id: DescriptorId) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > NAME_LEN || bytes.contains(&0) {
            return Err(Error::NameTooLong);
        }
        let mut raw = [0; NAME_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            name: raw,
            is_valid: true,
            descriptor_id,
        })
    }

    pub fn name(&self) -> &str {
        let len = self.name_bytes().len();
        core::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    #[inline]
    pub fn name_bytes(&self) -> &[u8] {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(NAME_LEN);
        &self.name[..len]
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    #[inline]
    pub fn descriptor_id(&self) -> DescriptorId {
        self.descriptor_id
    }

    /// 名字相同的有效项
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.is_valid && self.name_bytes() == name.as_bytes()
    }

    /// 原地作废，槽位可被复用
    #[inline]
    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }
}

impl Record for DirEntry {
    const SIZE: usize = NAME_LEN + 1 + 2;
}

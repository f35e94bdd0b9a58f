// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Storage tags and versions of the serialized form.
//!
//! A serialized sketch is a one byte [`StorageType`] tag followed by one byte
//! per register: [`NUM_REGISTERS`](super::NUM_REGISTERS) bytes for
//! [`StorageType::Native`], [`LEGACY_NUM_REGISTERS`](super::LEGACY_NUM_REGISTERS)
//! bytes for [`StorageType::Legacy`].

use crate::error::Error;

/// Size of the storage tag in bytes.
pub(super) const TAG_SIZE: usize = 1;

/// Register layout of a serialized sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// The larger register array written by older storage versions.
    Legacy = 1,
    /// The current register array.
    Native = 2,
}

impl StorageType {
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for StorageType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(StorageType::Legacy),
            2 => Ok(StorageType::Native),
            _ => Err(Error::unknown_storage_type(tag)),
        }
    }
}

/// Storage version of the target a sketch is serialized for.
///
/// Versions before [`StorageVersion::NATIVE_REGISTERS`] can only read the
/// legacy register layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageVersion(u64);

impl StorageVersion {
    /// First version able to read [`StorageType::Native`].
    pub const NATIVE_REGISTERS: StorageVersion = StorageVersion(3);
    /// The version written by default.
    pub const CURRENT: StorageVersion = StorageVersion::NATIVE_REGISTERS;

    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    pub fn supports_native_registers(self) -> bool {
        self >= StorageVersion::NATIVE_REGISTERS
    }

    /// The register layout to write for this version.
    pub fn storage_type(self) -> StorageType {
        if self.supports_native_registers() {
            StorageType::Native
        } else {
            StorageType::Legacy
        }
    }
}

impl Default for StorageVersion {
    fn default() -> Self {
        StorageVersion::CURRENT
    }
}

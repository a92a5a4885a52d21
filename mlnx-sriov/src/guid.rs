/* -------------------------------------------------------------------------- *\
 *               Apache 2.0 License Copyright The Aurae Authors               *
 *                                                                            *
 *                +--------------------------------------------+              *
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 *                                                                            *
 * -------------------------------------------------------------------------- *
 *                                                                            *
 *   Licensed under the Apache License, Version 2.0 (the "License");          *
 *   you may not use this file except in compliance with the License.         *
 *   You may obtain a copy of the License at                                  *
 *                                                                            *
 *       http://www.apache.org/licenses/LICENSE-2.0                           *
 *                                                                            *
 *   Unless required by applicable law or agreed to in writing, software      *
 *   distributed under the License is distributed on an "AS IS" BASIS,        *
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. *
 *   See the License for the specific language governing permissions and      *
 *   limitations under the License.                                           *
 *                                                                            *
\* -------------------------------------------------------------------------- */

//! InfiniBand GUID handling.
//!
//! A Mellanox IPoIB hardware address is 20 octets: a 4 octet queue pair
//! number followed by the 16 octet GID. The trailing 8 octets of the GID are
//! the port GUID.
//!
//! ```text
//! address ff:00:00:00:00:00:02:00:00:02:c9:00:04:bd:70:03:00:37:44:86
//! guid                                        04bd700300374486
//! sysfs                                       04:bd:70:03:00:37:44:86
//! ```

use fancy_regex::Regex;
use lazy_static::lazy_static;
use std::{
    fmt::{Display, Formatter},
    ops::Deref,
};

/// Length of a colon separated 20 octet InfiniBand hardware address.
pub const MLNX_ADDRESS_LEN: usize = 59;

// 8 octets, colon separated
const GUID_SUFFIX_LEN: usize = 24;

lazy_static! {
    static ref GUID_PATTERN: Regex =
        Regex::new(r"^[0-9a-fA-F]{16}$").expect("regex construction");
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuidError {
    #[error("'{guid}' is not a GUID, expected 16 hex digits")]
    Malformed { guid: String },
}

/// Reduce an InfiniBand hardware address to its port GUID.
///
/// Any input that is not exactly [`MLNX_ADDRESS_LEN`] long is returned
/// unchanged; callers treat that as "not an InfiniBand address".
pub fn derive_guid(address: &str) -> String {
    match address.get(MLNX_ADDRESS_LEN - GUID_SUFFIX_LEN..) {
        Some(suffix) if address.len() == MLNX_ADDRESS_LEN => {
            suffix.replace(':', "")
        }
        _ => address.to_owned(),
    }
}

/// Split a contiguous hex string into colon separated octets, the form the
/// kernel accepts for `sriov/<vf>/node` and `sriov/<vf>/port`.
pub fn format_guid_for_write(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    chars
        .chunks(2)
        .map(|octet| octet.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// A validated, lower case, 16 hex digit GUID.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Guid(String);

impl Guid {
    pub fn parse(input: &str) -> Result<Self, GuidError> {
        match GUID_PATTERN.is_match(input) {
            Ok(true) => Ok(Self(input.to_ascii_lowercase())),
            _ => Err(GuidError::Malformed { guid: input.to_owned() }),
        }
    }

    /// Derive the port GUID of a local interface from its hardware address.
    /// Returns `None` when the address is not an InfiniBand address.
    pub fn from_address(address: &str) -> Option<Self> {
        if address.len() != MLNX_ADDRESS_LEN {
            return None;
        }
        Self::parse(&derive_guid(address)).ok()
    }

    pub fn to_sysfs(&self) -> String {
        format_guid_for_write(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for Guid {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

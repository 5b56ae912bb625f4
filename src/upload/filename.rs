// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use sha2::{Digest, Sha256};

/// Generate the remote file name for an upload
///
/// Format: lowercase hex SHA-256 of the full original file name, followed by
/// the original extension exactly as it was written. Nothing of the original
/// name is readable in the result.
pub fn safe_file_name(file_name: &str, extension: &str) -> String {
    let digest = Sha256::digest(file_name.as_bytes());

    if extension.is_empty() {
        format!("{:x}", digest)
    } else {
        format!("{:x}.{}", digest, extension)
    }
}

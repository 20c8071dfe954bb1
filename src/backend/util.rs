// Helpers for the fixed-size, nul-terminated name arrays Vulkan hands back
// (layer names, extension names, device names).

use std::ffi::{c_char, CStr};

/// Bytes of a fixed-size name array up to (not including) the first nul.
fn name_bytes(raw: &[c_char]) -> impl Iterator<Item = u8> + '_ {
    raw.iter().take_while(|&&c| c != 0).map(|&c| c as u8)
}

/// Exact, case-sensitive comparison of a driver name array against `name`.
pub fn name_matches(raw: &[c_char], name: &CStr) -> bool {
    name_bytes(raw).eq(name.to_bytes().iter().copied())
}

pub fn name_to_string(raw: &[c_char]) -> String {
    String::from_utf8_lossy(&name_bytes(raw).collect::<Vec<_>>()).into_owned()
}

/// Fill a fixed-size name array, the way the driver would.
#[cfg(test)]
pub fn fixed_name<const N: usize>(name: &str) -> [c_char; N] {
    let mut raw = [0 as c_char; N];
    for (dst, src) in raw.iter_mut().zip(name.bytes()) {
        *dst = src as c_char;
    }
    raw
}

//! CRC 校验和计算.
//!
//! 提供 CRC-32 (IEEE 802.3) 计算, 用于对解码出的画面做内容指纹.

/// CRC-32 查找表 (反射多项式 0xEDB88320)
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// 计算 CRC-32
///
/// 与 zlib / PNG 使用的 CRC-32 一致 (初始值与结果均取反).
pub fn crc32(data: &[u8]) -> u32 {
    crc32_update(0, data)
}

/// 在已有 CRC-32 的基础上继续累加数据
pub fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    let mut crc = !crc;
    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc as u8) ^ byte) as usize];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_空数据() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn test_crc32_已知向量() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_crc32_分段累加() {
        let whole = crc32(b"hello world");
        let part = crc32_update(crc32(b"hello "), b"world");
        assert_eq!(whole, part);
    }
}

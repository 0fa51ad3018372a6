//! CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF, no reflection.

const POLYNOMIAL: u16 = 0x1021;

pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ POLYNOMIAL } else { crc << 1 };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::crc16;

    #[test]
    fn check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn single_bit_flip_changes_checksum() {
        let mut block = vec![0x61; 2048];
        let before = crc16(&block);
        block[1000] ^= 0x04;
        assert_ne!(before, crc16(&block));
    }
}

use crate::utils::error::{AppError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::Rng;

const NONCE_LEN: usize = 12;

/// 数据源密码的加解密器 (AES-256-GCM)
/// 存储格式：base64(nonce || 密文)，nonce 每次加密随机生成
pub struct PasswordCipher {
    key: [u8; 32],
}

impl PasswordCipher {
    /// 密钥文本不足 32 字节时右侧补零，超出则截断
    pub fn new(key_text: &str) -> Self {
        let mut key = [0u8; 32];
        let bytes = key_text.as_bytes();
        let len = bytes.len().min(32);
        key[..len].copy_from_slice(&bytes[..len]);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| AppError::Encryption(format!("Bad cipher key: {}", e)))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce_bytes);

        let sealed = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(format!("Password encryption failed: {}", e)))?;

        let mut packed = Vec::with_capacity(NONCE_LEN + sealed.len());
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&sealed);
        Ok(BASE64.encode(packed))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let packed = BASE64.decode(encrypted).map_err(|e| {
            AppError::Encryption(format!("Stored password is not valid base64: {}", e))
        })?;

        // nonce 之外至少还要有密文
        if packed.len() <= NONCE_LEN {
            return Err(AppError::Encryption(
                "Stored password is too short to contain a nonce".to_string(),
            ));
        }

        let (nonce_bytes, sealed) = packed.split_at(NONCE_LEN);
        let plain = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| {
                AppError::Encryption(
                    "Password decryption failed (wrong key or corrupted data)".to_string(),
                )
            })?;

        String::from_utf8(plain)
            .map_err(|e| AppError::Encryption(format!("Decrypted password is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let cipher = PasswordCipher::new("unit_test_key");
        let encrypted = cipher.encrypt("my_secret_password").unwrap();
        assert_ne!(encrypted, "my_secret_password");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "my_secret_password");
    }

    #[test]
    fn test_short_key_is_padded_deterministically() {
        // 同一个短密钥的两个实例必须互通
        let a = PasswordCipher::new("k");
        let b = PasswordCipher::new("k");
        let encrypted = a.encrypt("pw").unwrap();
        assert_eq!(b.decrypt(&encrypted).unwrap(), "pw");
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = PasswordCipher::new("key_one").encrypt("pw").unwrap();
        assert!(PasswordCipher::new("key_two").decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_decrypt_rejects_invalid_base64() {
        let cipher = PasswordCipher::new("unit_test_key");
        assert!(cipher.decrypt("not base64!").is_err());
    }

    #[test]
    fn test_decrypt_rejects_truncated_payload() {
        // 合法 base64，但解码后凑不够 nonce + 密文
        let cipher = PasswordCipher::new("unit_test_key");
        let nonce_only = BASE64.encode([0u8; NONCE_LEN]);
        assert!(cipher.decrypt(&nonce_only).is_err());
        assert!(cipher.decrypt(&BASE64.encode(b"tiny")).is_err());
    }
}

//! External Signal Providers - Chữ ký số & file metadata
//!
//! Signature verification và version-info đọc từ OS là collaborators bên
//! ngoài engine: core chỉ tiêu thụ kết quả. Các traits ở đây là seam để
//! inject fake providers trong tests; engine không bao giờ fail vì provider
//! lỗi: mọi lỗi degrade về `SignatureStatus::Unknown` / `None`.

use std::collections::HashMap;
use std::path::Path;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::constants::SIGNATURE_CACHE_MAX;
use super::types::SignatureStatus;

// ============================================================================
// PROVIDER TRAITS
// ============================================================================

/// Kiểm tra chữ ký số của một file
pub trait SignatureProvider: Send + Sync {
    fn verify(&self, file_path: &Path) -> SignatureStatus;
}

/// Đọc publisher / product strings từ file metadata
pub trait MetadataReader: Send + Sync {
    fn file_description(&self, file_path: &Path) -> Option<String>;
    fn company_name(&self, file_path: &Path) -> Option<String>;
}

// ============================================================================
// NULL PROVIDERS
// ============================================================================

/// Provider không làm gì - dùng khi OS không hỗ trợ hoặc trong tests
pub struct NullSignatureProvider;

impl SignatureProvider for NullSignatureProvider {
    fn verify(&self, _file_path: &Path) -> SignatureStatus {
        SignatureStatus::Unknown
    }
}

pub struct NullMetadataReader;

impl MetadataReader for NullMetadataReader {
    fn file_description(&self, _file_path: &Path) -> Option<String> {
        None
    }

    fn company_name(&self, _file_path: &Path) -> Option<String> {
        None
    }
}

// ============================================================================
// SIGNATURE CACHE
// ============================================================================

/// Cache kết quả verify theo path (tránh verify lại mỗi cycle)
static SIGNATURE_CACHE: Lazy<RwLock<HashMap<String, SignatureStatus>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Verify qua cache. Eviction đơn giản: clear nửa cache khi đầy.
pub fn verify_cached(provider: &dyn SignatureProvider, file_path: &Path) -> SignatureStatus {
    let path_key = file_path.to_string_lossy().to_lowercase();

    if let Some(cached) = SIGNATURE_CACHE.read().get(&path_key) {
        return cached.clone();
    }

    let status = provider.verify(file_path);

    {
        let mut cache = SIGNATURE_CACHE.write();
        if cache.len() >= SIGNATURE_CACHE_MAX {
            let keys: Vec<_> = cache.keys().take(SIGNATURE_CACHE_MAX / 2).cloned().collect();
            for key in keys {
                cache.remove(&key);
            }
        }
        cache.insert(path_key, status.clone());
    }

    status
}

/// Clear signature cache
pub fn clear_cache() {
    SIGNATURE_CACHE.write().clear();
}

pub fn cache_size() -> usize {
    SIGNATURE_CACHE.read().len()
}

// ============================================================================
// OS PROVIDERS (Windows Authenticode via PowerShell)
// ============================================================================

#[cfg(windows)]
pub use windows_impl::{PsMetadataReader, PsSignatureProvider};

#[cfg(windows)]
mod windows_impl {
    use std::path::Path;
    use std::time::Duration;

    use crate::constants::OS_COMMAND_TIMEOUT_SECS;
    use crate::logic::oscmd::run_with_timeout;
    use crate::logic::process_intel::types::SignatureStatus;

    use super::{MetadataReader, SignatureProvider};

    /// Publishers tin cậy mặc định
    const TRUSTED_PUBLISHERS: &[&str] = &[
        "Microsoft Corporation",
        "Microsoft Windows",
        "Microsoft Windows Publisher",
        "Google LLC",
        "Mozilla Corporation",
        "Apple Inc.",
        "Adobe Inc.",
        "Valve",
        "NVIDIA Corporation",
        "Intel Corporation",
        "Realtek Semiconductor Corp.",
    ];

    fn is_publisher_trusted(publisher: &str) -> bool {
        let publisher_lower = publisher.to_lowercase();
        TRUSTED_PUBLISHERS.iter().any(|trusted| publisher_lower.contains(&trusted.to_lowercase()))
    }

    /// Extract Common Name (CN) from a certificate subject
    fn extract_cn(subject: &str) -> String {
        for part in subject.split(',') {
            let part = part.trim();
            if let Some(cn) = part.strip_prefix("CN=").or_else(|| part.strip_prefix("cn=")) {
                return cn.trim_matches('"').to_string();
            }
        }
        subject.split(',').next().unwrap_or(subject).trim().to_string()
    }

    pub struct PsSignatureProvider;

    impl SignatureProvider for PsSignatureProvider {
        fn verify(&self, file_path: &Path) -> SignatureStatus {
            if !file_path.is_file() {
                return SignatureStatus::Unknown;
            }

            let script = format!(
                "$sig = Get-AuthenticodeSignature -FilePath '{}'; \
                 @{{ Status = $sig.Status.ToString(); \
                    Subject = if ($sig.SignerCertificate) {{ $sig.SignerCertificate.Subject }} else {{ $null }} \
                 }} | ConvertTo-Json -Compress",
                file_path.display()
            );

            let output = match run_with_timeout(
                "powershell",
                &["-NoProfile", "-Command", &script],
                Duration::from_secs(OS_COMMAND_TIMEOUT_SECS),
            ) {
                Ok(out) if out.success => out.stdout,
                _ => return SignatureStatus::Unknown,
            };

            let parsed: serde_json::Value = match serde_json::from_str(output.trim()) {
                Ok(v) => v,
                Err(_) => return SignatureStatus::Unknown,
            };

            match parsed["Status"].as_str().unwrap_or("") {
                "Valid" => {
                    let publisher = parsed["Subject"].as_str().map(extract_cn).unwrap_or_default();
                    if is_publisher_trusted(&publisher) {
                        SignatureStatus::SignedTrusted { publisher }
                    } else {
                        SignatureStatus::SignedUnknown { publisher }
                    }
                }
                "NotSigned" | "HashMismatch" | "NotTrusted" => SignatureStatus::Unsigned,
                _ => SignatureStatus::Unknown,
            }
        }
    }

    pub struct PsMetadataReader;

    impl PsMetadataReader {
        fn version_info_field(&self, file_path: &Path, field: &str) -> Option<String> {
            if !file_path.is_file() {
                return None;
            }
            let script = format!(
                "(Get-Item '{}').VersionInfo.{}",
                file_path.display(),
                field
            );
            let output = run_with_timeout(
                "powershell",
                &["-NoProfile", "-Command", &script],
                Duration::from_secs(OS_COMMAND_TIMEOUT_SECS),
            )
            .ok()?;
            if !output.success {
                return None;
            }
            let value = output.stdout.trim().to_string();
            if value.is_empty() {
                None
            } else {
                Some(value)
            }
        }
    }

    impl MetadataReader for PsMetadataReader {
        fn file_description(&self, file_path: &Path) -> Option<String> {
            self.version_info_field(file_path, "FileDescription")
        }

        fn company_name(&self, file_path: &Path) -> Option<String> {
            self.version_info_field(file_path, "CompanyName")
        }
    }
}

/// Provider mặc định cho platform hiện tại
pub fn default_signature_provider() -> Box<dyn SignatureProvider> {
    #[cfg(windows)]
    {
        Box::new(PsSignatureProvider)
    }
    #[cfg(not(windows))]
    {
        Box::new(NullSignatureProvider)
    }
}

pub fn default_metadata_reader() -> Box<dyn MetadataReader> {
    #[cfg(windows)]
    {
        Box::new(PsMetadataReader)
    }
    #[cfg(not(windows))]
    {
        Box::new(NullMetadataReader)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct CountingProvider(std::sync::atomic::AtomicU32);

    impl SignatureProvider for CountingProvider {
        fn verify(&self, _file_path: &Path) -> SignatureStatus {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            SignatureStatus::Unsigned
        }
    }

    #[test]
    fn test_cache_avoids_reverification() {
        clear_cache();
        let provider = CountingProvider(std::sync::atomic::AtomicU32::new(0));
        let path = PathBuf::from(r"C:\temp\cache-probe.exe");

        let first = verify_cached(&provider, &path);
        let second = verify_cached(&provider, &path);

        assert_eq!(first, SignatureStatus::Unsigned);
        assert_eq!(second, SignatureStatus::Unsigned);
        assert_eq!(provider.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        clear_cache();
    }
}

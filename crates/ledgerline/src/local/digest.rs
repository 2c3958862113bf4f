use ledgerline_protocol::{HashFunction, HashRequest, HashResponse, ServiceResult};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fs;
use tracing::{debug, warn};

/// Computes file digests in-process.
///
/// Answers like a remote function would: problems with the request come back
/// as a non-200 status, not as an error.
#[derive(Debug, Clone, Default)]
pub struct LocalDigestFunction;

impl LocalDigestFunction {
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for LocalDigestFunction {
    fn invoke(&self, function_name: &str, request: &HashRequest) -> ServiceResult<HashResponse> {
        let bytes = match fs::read(&request.absolute_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(function = function_name, path = %request.absolute_path, error = %e, "Cannot read file to hash");
                return Ok(HashResponse {
                    status_code: 404,
                    body: format!("cannot read {}: {}", request.absolute_path, e),
                });
            }
        };
        let bytes = if request.use_line_ending_conversion {
            normalize_line_endings(&bytes)
        } else {
            bytes
        };

        let response = match digest_hex(&request.algorithm, &bytes) {
            Some(digest) => HashResponse {
                status_code: 200,
                body: digest,
            },
            None => HashResponse {
                status_code: 400,
                body: format!("unsupported algorithm {}", request.algorithm),
            },
        };
        debug!(
            function = function_name,
            algorithm = %request.algorithm,
            status = response.status_code,
            "Computed digest"
        );
        Ok(response)
    }
}

/// Lowercase hex digest, or `None` for an algorithm outside the sha2 family.
pub fn digest_hex(algorithm: &str, bytes: &[u8]) -> Option<String> {
    let normalized = algorithm.trim().to_ascii_lowercase().replace('-', "");
    let digest = match normalized.as_str() {
        "sha256" => hex::encode(Sha256::digest(bytes)),
        "sha384" => hex::encode(Sha384::digest(bytes)),
        "sha512" => hex::encode(Sha512::digest(bytes)),
        _ => return None,
    };
    Some(digest)
}

fn normalize_line_endings(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, algorithm: &str, convert: bool) -> HashRequest {
        HashRequest {
            absolute_path: path.to_string(),
            algorithm: algorithm.to_string(),
            use_line_ending_conversion: convert,
        }
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            digest_hex("SHA-256", b"abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(digest_hex("md5", b"abc").is_none());
    }

    #[test]
    fn line_ending_conversion_matches_unix_file() {
        let dir = tempfile::tempdir().unwrap();
        let dos = dir.path().join("dos.txt");
        let unix = dir.path().join("unix.txt");
        fs::write(&dos, "a\r\nb\r\n").unwrap();
        fs::write(&unix, "a\nb\n").unwrap();

        let function = LocalDigestFunction::new();
        let converted = function
            .invoke("hash", &request(dos.to_str().unwrap(), "sha256", true))
            .unwrap();
        let plain = function
            .invoke("hash", &request(unix.to_str().unwrap(), "sha256", false))
            .unwrap();
        assert_eq!(converted.status_code, 200);
        assert_eq!(converted.body, plain.body);
    }

    #[test]
    fn problems_come_back_as_status_codes() {
        let function = LocalDigestFunction::new();
        let missing = function
            .invoke("hash", &request("/nonexistent/ledgerline.txt", "sha256", false))
            .unwrap();
        assert_eq!(missing.status_code, 404);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "x").unwrap();
        let unsupported = function
            .invoke("hash", &request(path.to_str().unwrap(), "crc32", false))
            .unwrap();
        assert_eq!(unsupported.status_code, 400);
    }
}

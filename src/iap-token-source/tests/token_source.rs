// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use iap_token_source::credentials::loader::Environment;
use iap_token_source::credentials::{Flow, TokenSource};
use iap_token_source::transport::{HttpResponse, PostForm};

type Result<T> = iap_token_source::Result<T>;

#[cfg(test)]
mod test {
    use super::*;
    use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
    use bytes::Bytes;
    use http::StatusCode;
    use httptest::matchers::{all_of, contains, request, url_decoded};
    use httptest::responders::status_code;
    use httptest::{Expectation, Server};
    use rsa::RsaPrivateKey;
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use rsa::sha2::Sha256;
    use rsa::signature::Verifier;
    use scoped_env::ScopedEnv;
    use serde_json::{Value, json};
    use std::io::Write;
    use std::sync::{Arc, LazyLock, Mutex};
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    static RSA_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(|| {
        RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 2048).expect("failed to generate a key")
    });

    fn pkcs8_pem() -> String {
        RSA_KEY
            .to_pkcs8_pem(LineEnding::LF)
            .expect("Failed to encode key to PKCS#8 PEM")
            .to_string()
    }

    fn pkcs1_pem() -> String {
        RSA_KEY
            .to_pkcs1_pem(LineEnding::LF)
            .expect("Failed to encode key to PKCS#1 PEM")
            .to_string()
    }

    fn service_account_json(private_key: String) -> Value {
        json!({
            "type": "service_account",
            "client_email": "hello-world@example.com",
            "private_key_id": "test-private-key-id",
            "private_key": private_key,
            "project_id": "test-project-id",
        })
    }

    fn b64_decode_to_json(s: &str) -> Value {
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(s).unwrap();
        serde_json::from_slice(&decoded).unwrap()
    }

    // A transport that records the requests and answers with a fixed body.
    #[derive(Debug, Default)]
    struct FakeTransport {
        body: &'static str,
        requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
    }

    #[async_trait::async_trait]
    impl PostForm for FakeTransport {
        async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), form.to_vec()));
            Ok(HttpResponse {
                status: StatusCode::OK,
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    #[tokio::test]
    async fn hello_world() -> TestResult {
        let transport = FakeTransport {
            body: r#"{"id_token":"hello-world"}"#,
            ..FakeTransport::default()
        };
        let requests = transport.requests.clone();

        let token_source = TokenSource::builder("test@example.com")
            .with_service_account(service_account_json(pkcs8_pem()))
            .with_transport(transport)
            .with_environment(Environment::default())
            .build()
            .await?;
        let token = token_source.token().await?;
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.access_token, "hello-world");
        assert_eq!(token.authorization(), "Bearer hello-world");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (url, form) = &requests[0];
        assert_eq!(url, "https://www.googleapis.com/oauth2/v4/token");
        let assertion = form
            .iter()
            .find(|(k, _)| k == "assertion")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let claims = b64_decode_to_json(assertion.split('.').nth(1).unwrap_or_default());
        assert_eq!(claims["aud"], "https://www.googleapis.com/oauth2/v4/token");
        assert_eq!(claims["iss"], "hello-world@example.com");
        assert_eq!(claims["target_audience"], "test@example.com");
        Ok(())
    }

    #[test_case(pkcs8_pem(); "pkcs8")]
    #[test_case(pkcs1_pem(); "pkcs1")]
    #[tokio::test]
    async fn exchange_over_http(private_key: String) -> TestResult {
        let server = Server::run();
        let token_uri = server.url("/token").to_string();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/token"),
                request::body(url_decoded(contains((
                    "grant_type",
                    "urn:ietf:params:oauth:grant-type:jwt-bearer"
                )))),
            ])
            .times(1)
            .respond_with(
                status_code(200)
                    .insert_header("content-type", "application/json")
                    .body(r#"{"id_token":"test-id-token","expires_in":3600}"#),
            ),
        );

        let mut json = service_account_json(private_key);
        json["token_uri"] = Value::from(token_uri.clone());
        let token_source = TokenSource::builder("test-audience")
            .with_service_account(json)
            .with_environment(Environment::default())
            .build()
            .await?;
        let token = token_source.token().await?;
        assert_eq!(token.access_token, "test-id-token");
        Ok(())
    }

    #[tokio::test]
    async fn assertion_signature() -> TestResult {
        let transport = FakeTransport {
            body: r#"{"id_token":"test-id-token"}"#,
            ..FakeTransport::default()
        };
        let requests = transport.requests.clone();
        let _token_source = TokenSource::builder("test-audience")
            .with_service_account(service_account_json(pkcs8_pem()))
            .with_transport(transport)
            .with_environment(Environment::default())
            .build()
            .await?;

        let requests = requests.lock().unwrap();
        let (_, form) = &requests[0];
        let assertion = form
            .iter()
            .find(|(k, _)| k == "assertion")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let parts = assertion.split('.').collect::<Vec<_>>();
        assert_eq!(parts.len(), 3, "{assertion}");
        let header = b64_decode_to_json(parts[0]);
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["kid"], "test-private-key-id");

        let key = VerifyingKey::<Sha256>::new(RSA_KEY.to_public_key());
        let signature = Signature::try_from(BASE64_URL_SAFE_NO_PAD.decode(parts[2])?.as_slice())?;
        key.verify(format!("{}.{}", parts[0], parts[1]).as_bytes(), &signature)?;
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_private_key() {
        let err = TokenSource::builder("test-audience")
            .with_service_account(service_account_json("not a key".to_string()))
            .with_transport(FakeTransport::default())
            .with_environment(Environment::default())
            .build()
            .await
            .unwrap_err();
        assert!(err.is_signing(), "{err:?}");
    }

    #[tokio::test]
    async fn credentials_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(service_account_json(pkcs8_pem()).to_string().as_bytes())?;
        file.flush()?;

        let token_source = TokenSource::builder("test-audience")
            .with_credentials_file(file.path())
            .with_transport(FakeTransport {
                body: r#"{"id_token":"test-id-token"}"#,
                ..FakeTransport::default()
            })
            .with_environment(Environment::default())
            .build()
            .await?;
        assert_eq!(token_source.flow(), Flow::ServiceAccount);
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn credentials_from_env_var() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(service_account_json(pkcs8_pem()).to_string().as_bytes())?;
        file.flush()?;
        let path = file.path().to_string_lossy().to_string();
        let _e = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", &path);

        let token_source = TokenSource::builder("test-audience")
            .with_transport(FakeTransport {
                body: r#"{"id_token":"test-id-token"}"#,
                ..FakeTransport::default()
            })
            .build()
            .await?;
        assert_eq!(token_source.flow(), Flow::ServiceAccount);
        let token = token_source.token().await?;
        assert_eq!(token.access_token, "test-id-token");
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn credentials_env_var_is_not_a_file() {
        let _e = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", "file-does-not-exist.json");
        let err = TokenSource::builder("test-audience")
            .with_transport(FakeTransport::default())
            .build()
            .await
            .unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
        let msg = err.to_string();
        assert!(msg.contains("file-does-not-exist.json"), "{msg}");
        assert!(msg.contains("GOOGLE_APPLICATION_CREDENTIALS"), "{msg}");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn fallback_to_metadata() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path(
                    "GET",
                    "/computeMetadata/v1/instance/service-accounts/default/identity"
                ),
                request::headers(contains(("metadata-flavor", "Google"))),
                request::query(url_decoded(contains(("audience", "test-audience")))),
            ])
            .respond_with(status_code(200).body("test-id-token")),
        );

        let _e1 = ScopedEnv::remove("GOOGLE_APPLICATION_CREDENTIALS");
        let _e2 = ScopedEnv::remove("HOME"); // For posix
        let _e3 = ScopedEnv::remove("APPDATA"); // For windows
        let addr = server.addr().to_string();
        let _e4 = ScopedEnv::set("GCE_METADATA_HOST", &addr);

        let token_source = TokenSource::builder("test-audience").build().await?;
        assert_eq!(token_source.flow(), Flow::Metadata);
        let headers = token_source.headers().await?;
        let value = headers.get(http::header::AUTHORIZATION).unwrap();
        assert_eq!(value.to_str()?, "Bearer test-id-token");
        Ok(())
    }
}

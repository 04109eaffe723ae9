//! End-to-end client flows against an in-memory repository.
//!
//! `FakeRepository` answers requests the way the live service does: JSON
//! envelopes for `rpc.php`, redirects for accepted form posts and HTML
//! fragments for everything else.

use aurcli::api::transport::decode_body;
use aurcli::api::{
    ActionOutcome, ApiClient, CommentStatus, CredentialPrompt, HttpRequest, HttpResponse, Method,
    SessionStore, TarballSource, Transport, UploadOutcome, UploadRequest,
};
use aurcli::{AurError, SortField};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::io::{Cursor, Write};

const BASE: &str = "https://aur.test";

#[derive(Default)]
struct FakeRepository {
    seen: RefCell<Vec<HttpRequest>>,
}

impl FakeRepository {
    fn requests(&self) -> Vec<HttpRequest> {
        self.seen.borrow().clone()
    }

    fn gzip_json(body: &str) -> HttpResponse {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(body.as_bytes()).unwrap();
        HttpResponse::new(200)
            .with_header("content-encoding", "gzip")
            .with_body(enc.finish().unwrap())
    }

    fn route(&self, req: &HttpRequest) -> HttpResponse {
        let path = req.url.strip_prefix(BASE).unwrap_or(&req.url);
        match (req.method, path) {
            (Method::Get, p) if p.starts_with("/rpc.php?type=search&arg=dz") => Self::gzip_json(
                r#"{"type":"search","results":[
                    {"ID":"10","Name":"dzen2","Version":"0.8.5-1","CategoryID":"17","NumVotes":"40","OutOfDate":"0","Description":"status bar"},
                    {"ID":"11","Name":"dzlad","Version":"0.1.1-1","CategoryID":"16","NumVotes":"3","OutOfDate":"1","Description":"AUR helper"}
                ]}"#,
            ),
            (Method::Get, p) if p.starts_with("/rpc.php?type=search") => {
                Self::gzip_json(r#"{"type":"error","results":"No results found"}"#)
            }
            (Method::Get, p) if p.starts_with("/rpc.php?type=msearch") => {
                Self::gzip_json(r#"{"type":"error","results":"Query arg too small"}"#)
            }
            (Method::Post, "/index.php") => {
                if req.body_text() == "user=joe&passwd=hunter2" {
                    HttpResponse::new(302)
                        .with_header("set-cookie", "AURSID=0123456789")
                        .with_header("location", "/")
                } else {
                    HttpResponse::new(200).with_body("<p>Bad username or password.</p>")
                }
            }
            (Method::Post, "/pkgsubmit.php") => {
                if req.body_text().contains("filename=\"dup.src.tar.gz\"") {
                    HttpResponse::new(200).with_body(
                        "<html>\n<span class='error'>You are not allowed to overwrite the <b>dup</b> package.</span><br />\n</html>",
                    )
                } else {
                    HttpResponse::new(302).with_header("location", "packages.php?ID=4521")
                }
            }
            (Method::Post, "/packages.php") => HttpResponse::new(200).with_body(
                "<p class=\"pkgoutput\">Your votes have been cast for the selected packages.</p>",
            ),
            _ => HttpResponse::new(404),
        }
    }
}

impl Transport for FakeRepository {
    fn send(&self, request: HttpRequest) -> aurcli::Result<HttpResponse> {
        let res = self.route(&request);
        self.seen.borrow_mut().push(request);
        let body = decode_body(&res.headers, &res.body)?;
        Ok(HttpResponse { body, ..res })
    }
}

struct NoStore;

impl SessionStore for NoStore {
    fn load(&self) -> Option<String> {
        None
    }

    fn save(&self, _cookie: &str) -> std::io::Result<()> {
        Ok(())
    }
}

struct NoPrompt;

impl CredentialPrompt for NoPrompt {
    fn username(&self) -> anyhow::Result<String> {
        anyhow::bail!("no terminal")
    }

    fn password(&self, _username: &str) -> anyhow::Result<String> {
        anyhow::bail!("no terminal")
    }
}

fn client() -> ApiClient<FakeRepository> {
    ApiClient::new(FakeRepository::default(), BASE)
}

#[test]
fn search_decodes_compressed_envelope() {
    let api = client();
    let packages = api.search("dz", Some(SortField::NumVotes)).unwrap();

    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].name, "dzlad");
    assert!(packages[0].out_of_date);
    assert_eq!(packages[0].category, Some("system"));
    assert_eq!(packages[1].num_votes, 40);
    assert_eq!(packages[1].category, Some("x11"));
}

#[test]
fn search_without_matches_is_empty() {
    assert!(client().search("nothing-here", None).unwrap().is_empty());
}

#[test]
fn service_errors_surface_as_bad_responses() {
    let err = client().maintainer_search("x", None).unwrap_err();
    assert!(matches!(err, AurError::BadResponse(m) if m == "Query arg too small"));
}

#[test]
fn login_upload_and_vote() {
    let mut api = client();
    let session = api
        .resolve_session(None, Some("joe"), Some("hunter2"), &NoStore, &NoPrompt)
        .unwrap();
    assert_eq!(session.cookie(), "AURSID=0123456789");
    api.set_session(session);

    let outcome = api
        .upload(UploadRequest {
            tarball: TarballSource::reader(
                Cursor::new(vec![0x1f, 0x8b, 0x08, 0x00]),
                Some("ffcast.src.tar.gz".into()),
            ),
            category: "12".into(),
            comment: None,
        })
        .unwrap();
    assert_eq!(
        outcome,
        UploadOutcome::Uploaded {
            id: 4521,
            comment: CommentStatus::NotRequested
        }
    );

    let outcome = api.perform_action("vote", &[4521]).unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Message("Your votes have been cast for the selected packages.".into())
    );

    let requests = api.transport().requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1..]
        .iter()
        .all(|r| r.header_value("cookie") == Some("AURSID=0123456789")));
    assert_eq!(requests[2].body_text(), "IDs[4521]=1&action=do_Vote");
}

#[test]
fn rejected_upload_reports_page_message() {
    let api = client().with_session(aurcli::api::Session::supplied("AURSID=1"));
    let outcome = api
        .upload(UploadRequest {
            tarball: TarballSource::reader(
                Cursor::new(b"x".to_vec()),
                Some("dup.src.tar.gz".into()),
            ),
            category: "2".into(),
            comment: None,
        })
        .unwrap();
    assert_eq!(
        outcome,
        UploadOutcome::Rejected {
            message: "You are not allowed to overwrite the dup package.".into()
        }
    );
}

#[test]
fn wrong_password_is_an_authentication_error() {
    let err = client()
        .resolve_session(
            Some("AURSID=old"),
            Some("joe"),
            Some("wrong"),
            &NoStore,
            &NoPrompt,
        )
        .unwrap_err();
    assert!(matches!(err, AurError::Authentication(_)));
}

#[test]
fn missing_credentials_without_terminal_fail_cleanly() {
    let err = client()
        .resolve_session(None, None, None, &NoStore, &NoPrompt)
        .unwrap_err();
    assert!(matches!(err, AurError::Authentication(_)));
}

use std::borrow::Cow;

use anyhow::Error;
use log::error;
use rouille::{Response, ResponseBody};

use crate::http_response_status_codes::HttpResponseStatusCode;


pub fn errorpage_from_status(status: HttpResponseStatusCode) -> Response {
    let title = status.title();
    let explanation = status.desc();
    let resp = format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>\
                        <p>{explanation}</p></body></html>\n");
    Response {
        status_code: status.code(),
        headers: vec![(Cow::from("Content-type"), Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_string(resp),
        upgrade: None,
    }
}

/// The error is logged with its context chain, the client only sees
/// a generic 500 page.
pub fn errorpage_from_error(err: Error) -> Response {
    let status = HttpResponseStatusCode::InternalServerError500;
    error!("error in page (returning {status:?}): {err:#}");
    errorpage_from_status(status)
}

pub fn htmlresponse(status: HttpResponseStatusCode, html: String) -> Response {
    Response {
        status_code: status.code(),
        headers: vec![(Cow::from("Content-type"),
                       Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_string(html),
        upgrade: None,
    }
}

pub fn javascriptresponse(js: String) -> Response {
    Response {
        status_code: HttpResponseStatusCode::OK200.code(),
        headers: vec![(Cow::from("Content-type"),
                       Cow::from("application/javascript; charset=utf-8")),
                      (Cow::from("Cache-Control"), Cow::from("no-cache"))],
        data: ResponseBody::from_string(js),
        upgrade: None,
    }
}

/// The HTTP status codes the server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpResponseStatusCode {
    OK200,
    NotFound404,
    InternalServerError500,
    NotImplemented501,
}

impl HttpResponseStatusCode {
    pub fn code(self) -> u16 {
        match self {
            HttpResponseStatusCode::OK200 => 200,
            HttpResponseStatusCode::NotFound404 => 404,
            HttpResponseStatusCode::InternalServerError500 => 500,
            HttpResponseStatusCode::NotImplemented501 => 501,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            HttpResponseStatusCode::OK200 => "OK",
            HttpResponseStatusCode::NotFound404 => "Not Found",
            HttpResponseStatusCode::InternalServerError500 => "Internal Server Error",
            HttpResponseStatusCode::NotImplemented501 => "Not Implemented",
        }
    }

    pub fn desc(self) -> &'static str {
        match self {
            HttpResponseStatusCode::OK200 =>
                "The request succeeded.",
            HttpResponseStatusCode::NotFound404 =>
                "The server cannot find the requested resource.",
            HttpResponseStatusCode::InternalServerError500 =>
                "The server has encountered a situation it does not know how to handle.",
            HttpResponseStatusCode::NotImplemented501 =>
                "The request method is not supported by the server and cannot be handled.",
        }
    }
}

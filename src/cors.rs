use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Method, Status},
    Request, Response,
};


const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";


/// Cross-origin access for the configured frontend origins.
pub struct Cors {
    origins: Vec<String>,
}

impl Cors {
    pub fn new(origins: Vec<String>) -> Self {
        Cors { origins }
    }

    fn allows(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == "*" || o == origin)
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let origin = match req.headers().get_one("Origin") {
            Some(origin) if self.allows(origin) => origin.to_owned(),
            _ => return,
        };

        res.set_header(Header::new("Access-Control-Allow-Origin", origin));
        res.set_header(Header::new("Vary", "Origin"));

        // Preflight requests have no route; answer them here.
        if req.method() == Method::Options {
            res.set_header(Header::new("Access-Control-Allow-Methods", ALLOWED_METHODS));
            res.set_header(Header::new("Access-Control-Allow-Headers", ALLOWED_HEADERS));
            res.set_header(Header::new("Access-Control-Max-Age", "3600"));
            res.set_status(Status::NoContent);
            res.set_sized_body(0, std::io::Cursor::new(""));
        }
    }
}

//! A tiny books catalog served over HTTP.
//!
//! Categories:
//! - Travel: two pages (2 + 1 books).
//! - Poetry: one page with one malformed item, then a 404 for page 2 even
//!   though page 1 advertises a next page.
//! - Broken: index page answers 500.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub struct CatalogServer {
    pub base_url: String,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for CatalogServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

const HOME: &str = r##"<!doctype html>
<html>
  <head><title>All products | Books to Scrape - Sandbox</title></head>
  <body>
    <div class="side_categories">
      <ul class="nav nav-list">
        <li>
          <a href="catalogue/category/books_1/index.html">Books</a>
          <ul>
            <li><a href="catalogue/category/books/travel_2/index.html">
                Travel
            </a></li>
            <li><a href="catalogue/category/books/poetry_3/index.html">
                Poetry
            </a></li>
            <li><a href="catalogue/category/books/broken_4/index.html">
                Broken
            </a></li>
          </ul>
        </li>
      </ul>
    </div>
  </body>
</html>
"##;

fn article(slug: &str, title: &str, price: &str, rating: &str) -> String {
    format!(
        r#"<li class="col-xs-6 col-sm-4 col-md-3 col-lg-3">
  <article class="product_pod">
    <div class="image_container">
      <a href="../../../{slug}/index.html"><img src="../../../../media/cache/{slug}.jpg" alt="{title}" class="thumbnail"></a>
    </div>
    <p class="star-rating {rating}">
      <i class="icon-star"></i>
    </p>
    <h3><a href="../../../{slug}/index.html" title="{title}">{title}</a></h3>
    <div class="product_price">
      <p class="price_color">{price}</p>
      <p class="instock availability">
        <i class="icon-ok"></i>
        In stock
      </p>
    </div>
  </article>
</li>"#
    )
}

fn listing(items: &[String], has_next: bool) -> String {
    let items = items.concat();
    let pager = if has_next {
        r#"<ul class="pager"><li class="current">Page 1</li><li class="next"><a href="page-2.html">next</a></li></ul>"#
    } else {
        r#"<ul class="pager"><li class="current">Page 2</li></ul>"#
    };
    format!(
        r#"<!doctype html>
<html><body>
  <section>
    <ol class="row">{items}</ol>
    <div>{pager}</div>
  </section>
</body></html>"#
    )
}

fn route(path: &str) -> (u16, String) {
    match path {
        "/" | "/index.html" => (200, HOME.to_string()),
        "/catalogue/category/books/travel_2/index.html" => (
            200,
            listing(
                &[
                    article("its-only-the-himalayas_981", "It's Only the Himalayas", "£45.17", "Two"),
                    article("full-moon-over-noahs-ark_811", "Full Moon over Noah’s Ark", "£49.43", "Four"),
                ],
                true,
            ),
        ),
        "/catalogue/category/books/travel_2/page-2.html" => (
            200,
            listing(
                &[article("see-america_732", "See America", "£48.87", "Three")],
                false,
            ),
        ),
        "/catalogue/category/books/poetry_3/index.html" => {
            let malformed = article("untitled_1", "Untitled", "£1.00", "One")
                .replace(r#" title="Untitled""#, "");
            (
                200,
                listing(
                    &[
                        malformed,
                        article("a-light-in-the-attic_1000", "A Light in the Attic", "£51.77", "Three"),
                    ],
                    true,
                ),
            )
        }
        "/catalogue/category/books/broken_4/index.html" => {
            (500, "internal server error".to_string())
        }
        _ => (404, "not found".to_string()),
    }
}

pub fn spawn() -> CatalogServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}/", server.server_addr());

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let path = request.url().split('?').next().unwrap_or("/").to_string();
            let (status, body) = route(&path);

            let mut response = tiny_http::Response::from_string(body).with_status_code(status);
            let header = tiny_http::Header::from_bytes(
                &b"Content-Type"[..],
                &b"text/html; charset=utf-8"[..],
            )
            .expect("build header");
            response.add_header(header);
            let _ = request.respond(response);
        }
    });

    CatalogServer {
        base_url,
        shutdown_tx,
        handle: Some(handle),
    }
}

use flowview::header::AUTHORIZATION;
use flowview::{Flow, Options, Request, Response, StickyAuth};

fn tflow() -> Flow {
  let request: Request = Request::builder()
    .uri("http://address:22/path")
    .body(())
    .unwrap()
    .into();
  Flow::new(request).with_response(Response::default())
}

#[test]
fn simple() {
  let mut auth = StickyAuth::new();
  auth
    .configure(&Options::default().with_stickyauth(".*"))
    .unwrap();

  let mut first = tflow();
  first
    .request
    .headers_mut()
    .insert(AUTHORIZATION, "foo".parse().unwrap());
  auth.request(&mut first);
  assert!(auth.contains_host("address"));

  let mut second = tflow();
  auth.request(&mut second);
  assert_eq!(second.request.headers()[AUTHORIZATION], "foo");
}

#[test]
fn only_matching_requests_take_part() {
  let mut auth = StickyAuth::new();
  auth
    .configure(&Options::default().with_stickyauth("~d ^address$ & ~m get"))
    .unwrap();

  let mut post = tflow();
  *post.request.method_mut() = flowview::Method::POST;
  post
    .request
    .headers_mut()
    .insert(AUTHORIZATION, "Basic b3RoZXI=".parse().unwrap());
  auth.request(&mut post);
  assert!(!auth.contains_host("address"));

  let mut get = tflow();
  get
    .request
    .headers_mut()
    .insert(AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
  auth.request(&mut get);
  assert_eq!(auth.header_for("address").unwrap(), "Basic dXNlcg==");

  // a request with its own credentials keeps them and replaces the memory
  let mut own = tflow();
  own
    .request
    .headers_mut()
    .insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
  auth.request(&mut own);
  assert_eq!(own.request.headers()[AUTHORIZATION], "Bearer abc");
  assert_eq!(auth.header_for("address").unwrap(), "Bearer abc");
}

use flowview::{Flow, Focus, Options, Request, Response, SignalEvent, StickyAuth, View};
use tracing_subscriber::EnvFilter;

fn flow(method: &str, uri: &str, start: f64) -> Result<Flow, Box<dyn std::error::Error>> {
  let request: Request = Request::builder().method(method).uri(uri).body(())?.into();
  Ok(Flow::new(request.with_timestamp_start(start)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
    .init();

  let mut view = View::new();
  view
    .signals_mut()
    .connect_all(|view: &View, event: &SignalEvent| {
      println!("{:?} -> {} visible", event, view.len());
    });
  let focus = Focus::new(&mut view);
  let mut auth = StickyAuth::new();
  auth.configure(&Options::default().with_stickyauth("~d httpbin"))?;

  let mut login = flow("POST", "https://httpbin.org/post", 1.0)?;
  login
    .request
    .headers_mut()
    .insert(flowview::header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse()?);
  auth.request(&mut login);
  let login_id = login.id();
  view.request(login);

  for (i, path) in ["/get", "/status/404", "/image/png"].iter().enumerate() {
    let mut next = flow("GET", &format!("https://httpbin.org{}", path), 2.0 + i as f64)?;
    auth.request(&mut next);
    view.request(next);
  }

  view.update_with(&login_id, |f| {
    f.response = Some(
      http::Response::builder()
        .status(200)
        .body("{\"ok\": true}")
        .map(Response::from)
        .unwrap_or_default(),
    );
  });

  view.configure(
    &Options::default()
      .with_filter("~m get")
      .with_order("url")
      .with_order_reversed(true),
  )?;
  for flow in &view {
    println!("{} {}", flow.request.method(), flow.request.pretty_url());
  }
  println!("focus: {:?} at {:?}", focus.flow(), focus.index());
  Ok(())
}

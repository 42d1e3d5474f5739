use gosub_http::{HttpError, HttpMessage, MockHttpClient, Next, Request, Response, ResponseSequence};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut client = MockHttpClient::new("https://api.example.com");
    client
        .add_mock_request("GET /users/*", json!({"name": "Ada"}))?
        .add_mock_request(
            "POST /jobs",
            ResponseSequence::new()
                .push_json(json!({"state": "queued"}))
                .push(Response::json(json!({"message": "Queue is full"})).with_status(503)),
        )?;

    client.add_middleware(|mut request: Request, next: Next<'_>| -> Result<Response, HttpError> {
        request.set_header("Authorization", "Bearer demo");
        let response = next.run(request)?;
        log::info!("{} -> {}", response.request().map(Request::url).unwrap_or("?"), response.status());
        Ok(response)
    });

    let user = client.get("/users/42", &[])?;
    println!("user: {}", user.body()?);

    for _ in 0..2 {
        let job = client.post("/jobs", json!({"task": "report"}))?;
        println!("job: {} {}", job.status(), job.raw_body());
    }

    client.set_throw_exceptions(true);
    match client.get("/missing", &[]) {
        Err(HttpError::Response(e)) => println!("error: {}\n{:#}", e, e.to_json()),
        other => println!("unexpected: {other:?}"),
    }

    for request in client.handler().history() {
        println!("sent {} {} ({})", request.method(), request.url(), request.header("Authorization"));
    }

    Ok(())
}

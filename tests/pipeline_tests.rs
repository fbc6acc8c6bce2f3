//! End-to-end pipeline tests: a loaded description driving requests
//! through a scripted transport, and response classification against
//! declared representations and faults.

use std::cell::RefCell;

use indexmap::{indexmap, IndexMap};
use pretty_assertions::assert_eq;

use wadl::{
    Application, Bindings, CallArgs, Error, HttpRequest, HttpResponse, ParameterError, Transport,
    TransportError, Value,
};

/// Scripted transport: hands back a canned response and keeps the
/// requests it saw.
struct Script {
    response: HttpResponse,
    requests: RefCell<Vec<HttpRequest>>,
}

impl Script {
    fn new(status: u16, content_type: &str, body: &str) -> Self {
        Self {
            response: HttpResponse {
                status,
                headers: indexmap! {
                    "Content-Type".to_string() => content_type.to_string(),
                },
                body: body.as_bytes().to_vec(),
            },
            requests: RefCell::new(Vec::new()),
        }
    }

    fn only_request(&self) -> HttpRequest {
        let requests = self.requests.borrow();
        assert_eq!(requests.len(), 1);
        requests[0].clone()
    }
}

impl Transport for Script {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        Ok(self.response.clone())
    }
}

const PALETTE: &str = r##"<?xml version="1.0"?>
<application xmlns="http://wadl.dev.java.net/2009/02">
  <resources base="http://www.example.com/">
    <resource id="top" path="palette">
      <param style="query" name="api_key" required="true" />
      <resource id="color" path="colors/{color}">
        <method href="#get_graphic" />
        <method href="#set_graphic" />
      </resource>
    </resource>
  </resources>

  <method name="GET" id="get_graphic">
    <request>
      <param name="shade" type="xsd:string" required="true" />
    </request>
    <response>
      <representation mediaType="application/xml" element="graphic" />
      <fault status="404" id="NoSuchColor" />
    </response>
  </method>

  <method name="POST" id="set_graphic">
    <request>
      <representation mediaType="application/x-www-form-urlencoded">
        <param name="new_graphic" type="xsd:string" required="true" />
        <param name="filename" type="xsd:string" required="true" />
      </representation>
    </request>
  </method>
</application>"##;

#[test]
fn request_format_merges_method_params() {
    let app = Application::from_xml(PALETTE).unwrap();
    let color = app
        .find_resource("top")
        .unwrap()
        .bind(&Bindings::new().query("api_key", "foobar"))
        .unwrap()
        .find_resource("color")
        .unwrap();

    let method = color.resource().find_method_by_id("get_graphic").unwrap();
    let uri = method
        .request_format()
        .unwrap()
        .uri(
            &color,
            &Bindings::new().path("color", "blue").query("shade", "light"),
        )
        .unwrap();
    assert_eq!(
        uri.to_string(),
        "http://www.example.com/palette/colors/blue?api_key=foobar&shade=light"
    );

    // The method-level required query param is enforced too.
    let err = method
        .request_format()
        .unwrap()
        .uri(&color, &Bindings::new().path("color", "blue"))
        .unwrap_err();
    match err {
        Error::Parameter(ParameterError::Missing { name, .. }) => assert_eq!(name, "shade"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn get_roundtrip_classifies_the_representation() {
    let app = Application::from_xml(PALETTE).unwrap();
    let transport = Script::new(
        200,
        "application/xml; charset=utf-8",
        "<graphic><shade>light blue</shade></graphic>",
    );

    let color = app
        .find_resource("top")
        .unwrap()
        .bind(&Bindings::new().query("api_key", "foobar"))
        .unwrap()
        .find_resource("color")
        .unwrap();

    let response = color
        .get(
            &CallArgs::new().bindings(
                Bindings::new().path("color", "blue").query("shade", "light"),
            ),
            &transport,
        )
        .unwrap();

    let request = transport.only_request();
    assert_eq!(request.method, "GET");
    assert_eq!(
        request.uri,
        "http://www.example.com/palette/colors/blue?api_key=foobar&shade=light"
    );
    assert!(request.headers.contains_key("User-Agent"));

    assert_eq!(response.status, 200);
    assert_eq!(response.media_type.as_deref(), Some("application/xml"));
    let graphic = response.document.unwrap();
    assert_eq!(graphic.name, "graphic");
    assert_eq!(graphic.children()[0].text(), Some("light blue"));
}

#[test]
fn declared_fault_surfaces_by_id() {
    let app = Application::from_xml(PALETTE).unwrap();
    let transport = Script::new(404, "text/plain", "no such color");

    let color = app
        .find_resource("top")
        .unwrap()
        .bind(&Bindings::new().query("api_key", "foobar"))
        .unwrap()
        .find_resource("color")
        .unwrap();

    let err = color
        .get(
            &CallArgs::new().bindings(
                Bindings::new().path("color", "puce").query("shade", "light"),
            ),
            &transport,
        )
        .unwrap_err();

    assert_eq!(err.fault_id(), Some("NoSuchColor"));
    match err {
        Error::Fault(fault) => {
            assert_eq!(fault.status, 404);
            assert_eq!(fault.text(), "no such color");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn form_post_roundtrip() {
    let app = Application::from_xml(PALETTE).unwrap();
    let transport = Script::new(200, "text/plain", "ok");

    let color = app
        .find_resource("top")
        .unwrap()
        .bind(&Bindings::new().query("api_key", "foobar"))
        .unwrap()
        .find_resource("color")
        .unwrap();

    let form = color.representation_for("post", true).unwrap();
    let body = form
        .form_body(&indexmap! {
            "new_graphic".to_string() => Value::from("foobar"),
            "filename".to_string() => Value::from("blue.jpg"),
        })
        .unwrap();
    assert_eq!(body, "new_graphic=foobar&filename=blue.jpg");

    // A missing required form value names the parameter.
    let err = form
        .form_body(&indexmap! {
            "new_graphic".to_string() => Value::from("foobar"),
        })
        .unwrap_err();
    match err {
        Error::Parameter(ParameterError::Missing { name, .. }) => assert_eq!(name, "filename"),
        other => panic!("unexpected error: {other}"),
    }

    let response = color
        .post(
            &CallArgs::new()
                .bindings(Bindings::new().path("color", "blue"))
                .body(body),
            &transport,
        )
        .unwrap();
    assert_eq!(response.status, 200);

    let request = transport.only_request();
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.body.as_deref(),
        Some("new_graphic=foobar&filename=blue.jpg")
    );
    assert_eq!(
        request.headers.get("Content-Type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn basic_auth_header_travels_with_the_call() {
    let app = Application::from_xml(PALETTE).unwrap();
    let transport = Script::new(200, "text/plain", "ok");

    let color = app
        .find_resource("top")
        .unwrap()
        .with_basic_auth("u", "p")
        .bind(&Bindings::new().query("api_key", "foobar"))
        .unwrap()
        .find_resource("color")
        .unwrap();

    color
        .get(
            &CallArgs::new().bindings(
                Bindings::new().path("color", "blue").query("shade", "light"),
            ),
            &transport,
        )
        .unwrap();

    let request = transport.only_request();
    assert_eq!(
        request.headers.get("Authorization").map(String::as_str),
        Some("Basic dTpw")
    );
}

#[test]
fn missing_resource_param_blocks_the_call() {
    let app = Application::from_xml(PALETTE).unwrap();
    let transport = Script::new(200, "text/plain", "ok");

    // The inherited api_key was never bound; the call stops before the
    // transport sees anything.
    let color = app
        .find_resource("top")
        .unwrap()
        .find_resource("color")
        .unwrap();
    let err = color
        .get(
            &CallArgs::new().bindings(
                Bindings::new().path("color", "blue").query("shade", "light"),
            ),
            &transport,
        )
        .unwrap_err();
    match err {
        Error::Parameter(ParameterError::Missing { name, .. }) => assert_eq!(name, "api_key"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(transport.requests.borrow().is_empty());
}

#[test]
fn load_from_file() {
    use std::io::Write as _;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PALETTE.as_bytes()).unwrap();

    let app = Application::from_file(file.path()).unwrap();
    assert_eq!(
        app.resource_list().unwrap().base(),
        Some("http://www.example.com/")
    );
    assert!(app.find_resource("top").is_some());

    assert!(matches!(
        Application::from_file("/definitely/not/there.wadl"),
        Err(Error::Io(_))
    ));
}

#[test]
fn head_verb_is_available() {
    const WITH_HEAD: &str = r#"
<application xmlns="http://wadl.dev.java.net/2009/02">
  <resources base="http://www.example.com/">
    <resource id="probe" path="probe">
      <method name="HEAD" id="probe_head" />
    </resource>
  </resources>
</application>"#;

    let app = Application::from_xml(WITH_HEAD).unwrap();
    let transport = Script::new(200, "text/plain", "");

    let probe = app.find_resource("probe").unwrap();
    let response = probe.head(&CallArgs::new(), &transport).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(transport.only_request().method, "HEAD");
}

#[test]
fn missing_verb_is_a_description_error() {
    let app = Application::from_xml(PALETTE).unwrap();
    let transport = Script::new(200, "text/plain", "ok");

    let top = app.find_resource("top").unwrap();
    let err = top.delete(&CallArgs::new(), &transport).unwrap_err();
    assert!(matches!(err, Error::Description(_)));
}

#[test]
fn response_without_content_type() {
    let headers: IndexMap<String, String> = IndexMap::new();
    let response = HttpResponse {
        status: 204,
        headers,
        body: Vec::new(),
    };
    assert_eq!(response.content_type(), None);
}

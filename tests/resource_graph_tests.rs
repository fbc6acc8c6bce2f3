//! Navigation and addressing tests over complete WADL documents:
//! lookup by id and path, reference rebinding, path parameter
//! substitution, and bound-resource traversal.

use pretty_assertions::assert_eq;

use wadl::{Application, Bindings, Error, ParameterError};

fn wadl(body: &str) -> Application {
    let xml = format!(
        r#"<?xml version="1.0"?>
<application xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
             xmlns:xsd="http://www.w3.org/2001/XMLSchema"
             xmlns="http://wadl.dev.java.net/2009/02">
{}
</application>"#,
        body
    );
    Application::from_xml(&xml).expect("description should load")
}

fn finding_fixture() -> Application {
    wadl(
        r##"
<resources base="http://www.example.com/">
  <resource id="green_things" path="green">
    <resource href="#frogs" />
    <resource id="pistachios" path="pistachio" />
    <method href="#fetch" />
  </resource>

  <resource id="hopping_things" path="hop">
    <resource href="#frogs" />
  </resource>

  <resource id="frogs" path="frog">
    <method name="POST" id="fetch_frog" />
  </resource>
</resources>

<method name="GET" id="fetch" />"##,
    )
}

#[test]
fn find_resource_by_id() {
    let app = finding_fixture();

    let green_things = app.find_resource("green_things").unwrap();
    let frogs = app.find_resource("frogs").unwrap();

    assert_eq!(green_things.id(), Some("green_things"));
    assert_eq!(frogs.path(), Some("frog"));
    assert_eq!(
        green_things.find_resource("frogs").unwrap().resource(),
        frogs.resource()
    );
    assert_eq!(
        green_things.find_resource("pistachios").unwrap().path(),
        Some("pistachio")
    );
}

#[test]
fn find_resource_by_path() {
    let app = finding_fixture();

    let by_path = app.find_resource_by_path("green").unwrap();
    assert_eq!(by_path.id(), Some("green_things"));

    let by_either = app.resource("green").unwrap();
    assert_eq!(by_either.id(), Some("green_things"));

    let frogs = by_path.find_resource_by_path("frog").unwrap();
    assert_eq!(frogs.id(), Some("frogs"));
}

#[test]
fn dereferenced_resource_takes_referrer_path() {
    let app = finding_fixture();

    let green_frogs = app
        .find_resource("green_things")
        .unwrap()
        .find_resource("frogs")
        .unwrap();
    assert_eq!(
        green_frogs.uri(&Bindings::new()).unwrap().to_string(),
        "http://www.example.com/green/frog"
    );

    let hopping_frogs = app
        .find_resource("hopping_things")
        .unwrap()
        .find_resource("frogs")
        .unwrap();
    assert_eq!(
        hopping_frogs.uri(&Bindings::new()).unwrap().to_string(),
        "http://www.example.com/hop/frog"
    );
}

#[test]
fn find_method_by_id_or_verb() {
    let app = finding_fixture();
    let frogs = app.find_resource("frogs").unwrap().resource();

    assert_eq!(frogs.find_method_by_id("fetch_frog").unwrap().verb(), "POST");
    assert_eq!(
        frogs.find_method_by_verb("POST").unwrap().id(),
        Some("fetch_frog")
    );
}

#[test]
fn find_dereferenced_method() {
    let app = finding_fixture();
    let green_things = app.find_resource("green_things").unwrap().resource();

    // The method is declared at the application level and referenced
    // from the resource.
    assert_eq!(green_things.find_method_by_id("fetch").unwrap().verb(), "GET");
}

fn insult_fixture() -> Application {
    wadl(
        r##"
<resources base="http://www.example.com/">
  <resource id="mad" path="im/mad/because">
    <resource href="#insult" />
  </resource>

  <resource id="insult" path="the/{person}/is/{a}">
    <param name="a" default="dork" style="matrix" />
    <param name="and" style="matrix" />
    <resource id="so-let's" path="so-let's/{do something}" />
  </resource>
</resources>"##,
    )
}

#[test]
fn path_parameter_substitution() {
    let app = insult_fixture();
    let insult = app.find_resource_by_path("the/{person}/is/{a}").unwrap();

    // Simple substitution; the embedded param keeps its matrix style.
    assert_eq!(
        insult
            .uri(&Bindings::new().path("person", "king").path("a", "fink"))
            .unwrap()
            .to_string(),
        "http://www.example.com/the/king/is/;a=fink"
    );

    // Default values fill in for unbound placeholders.
    assert_eq!(
        insult
            .uri(&Bindings::new().path("person", "king"))
            .unwrap()
            .to_string(),
        "http://www.example.com/the/king/is/;a=dork"
    );

    // An optional free-standing param becomes its own path fragment.
    assert_eq!(
        insult
            .uri(
                &Bindings::new()
                    .path("person", "king")
                    .path("a", "fink")
                    .path("and", "he can bite me")
            )
            .unwrap()
            .to_string(),
        "http://www.example.com/the/king/is/;a=fink/;and=he%20can%20bite%20me"
    );

    // The required placeholder is enforced, and named.
    let err = insult.uri(&Bindings::new()).unwrap_err();
    match err {
        Error::Parameter(ParameterError::Missing { name, .. }) => assert_eq!(name, "person"),
        other => panic!("unexpected error: {other}"),
    }

    // Multiple values for a single-valued parameter.
    let err = insult
        .uri(
            &Bindings::new()
                .path("person", "king")
                .path("a", vec!["fink", "dolt"]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Parameter(ParameterError::MultipleValues { .. })
    ));
}

#[test]
fn option_constrained_parameter() {
    let app = wadl(
        r#"
<resources base="http://www.example.com/">
  <resource id="fate" path="fates/{fate}">
    <param name="fate">
      <option value="Clotho" />
      <option value="Lachesis" />
      <option value="Atropos" />
    </param>
  </resource>
</resources>"#,
    );
    let fate = app.find_resource("fate").unwrap();

    assert_eq!(
        fate.uri(&Bindings::new().path("fate", "Clotho"))
            .unwrap()
            .to_string(),
        "http://www.example.com/fates/Clotho"
    );

    let err = fate
        .uri(&Bindings::new().path("fate", "Groucho"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Parameter(ParameterError::InvalidValue { .. })
    ));
}

#[test]
fn bound_resource_traversal() {
    let app = insult_fixture();

    let im_mad_because = app.find_resource("mad").unwrap();
    assert_eq!(
        im_mad_because.uri(&Bindings::new()).unwrap().to_string(),
        "http://www.example.com/im/mad/because"
    );

    // The referenced resource extends the referrer's address.
    let insult = im_mad_because.find_resource("insult").unwrap();
    assert_eq!(
        insult
            .uri(&Bindings::new().path("person", "king").path("a", "fink"))
            .unwrap()
            .to_string(),
        "http://www.example.com/im/mad/because/the/king/is/;a=fink"
    );

    // Bindings stick to the bound resource.
    let hes_a_fink = insult
        .bind(&Bindings::new().path("person", "king").path("a", "fink"))
        .unwrap();
    assert_eq!(
        hes_a_fink.uri(&Bindings::new()).unwrap().to_string(),
        "http://www.example.com/im/mad/because/the/king/is/;a=fink"
    );

    // And carry through further navigation.
    let lets = hes_a_fink.find_resource("so-let's").unwrap();
    assert_eq!(
        lets.uri(&Bindings::new().path("do something", "revolt"))
            .unwrap()
            .to_string(),
        "http://www.example.com/im/mad/because/the/king/is/;a=fink/so-let's/revolt"
    );

    // Rebinding an already-substituted placeholder has no effect.
    let revolt = lets
        .bind(
            &Bindings::new()
                .path("person", "fink")
                .path("do something", "revolt"),
        )
        .unwrap();
    assert_eq!(
        revolt.uri(&Bindings::new()).unwrap().to_string(),
        "http://www.example.com/im/mad/because/the/king/is/;a=fink/so-let's/revolt"
    );
}

#[test]
fn repeating_arguments() {
    for (style, expected) in [
        (
            "plain",
            "http://www.example.com/i/want/pony,water%20slide,BB%20gun",
        ),
        (
            "matrix",
            "http://www.example.com/i/want/;a=pony;a=water%20slide;a=BB%20gun",
        ),
    ] {
        let app = wadl(&format!(
            r#"
<resources base="http://www.example.com/">
  <resource id="list" path="i/want/{{a}}">
    <param name="a" repeating="true" style="{}" />
  </resource>
</resources>"#,
            style
        ));
        let list = app.find_resource("list").unwrap();
        assert_eq!(
            list.uri(&Bindings::new().path("a", vec!["pony", "water slide", "BB gun"]))
                .unwrap()
                .to_string(),
            expected
        );
    }
}

#[test]
fn fixed_value_overrides_binding() {
    let app = wadl(
        r#"
<resources base="http://www.example.com/">
  <resource id="poll" path="big-brother-is/{opinion}">
    <param name="opinion" fixed="doubleplusgood" />
  </resource>
</resources>"#,
    );
    let poll = app.find_resource("poll").unwrap();

    assert_eq!(
        poll.uri(&Bindings::new().path("opinion", "ungood"))
            .unwrap()
            .to_string(),
        "http://www.example.com/big-brother-is/doubleplusgood"
    );
}

#[test]
fn matrix_boolean_panel() {
    let app = wadl(
        r#"
<resources base="http://www.example.com/">
  <resource id="blinkenlights" path="light-panel/{light1}{light2}{light3}">
    <param name="light1" type="xsd:boolean" style="matrix" fixed="true" />
    <param name="light2" type="xsd:boolean" style="matrix" fixed="false" />
    <param name="light3" type="xsd:boolean" style="matrix" />
  </resource>
</resources>"#,
    );
    let lights = app.find_resource("blinkenlights").unwrap();

    let on = "http://www.example.com/light-panel/;light1;light3";
    let off = "http://www.example.com/light-panel/;light1";

    let uri = |bindings: &Bindings| lights.uri(bindings).unwrap().to_string();

    assert_eq!(uri(&Bindings::new().path("light3", "true")), on);
    assert_eq!(uri(&Bindings::new().path("light3", "1")), on);
    assert_eq!(uri(&Bindings::new().path("light3", true)), on);

    assert_eq!(uri(&Bindings::new()), off);
    assert_eq!(uri(&Bindings::new().path("light3", "false")), off);
    assert_eq!(uri(&Bindings::new().path("light3", "True")), off);
    assert_eq!(uri(&Bindings::new().path("light3", false)), off);
}

#[test]
fn template_params_with_basic_auth() {
    let app = wadl(
        r#"
<resources base="http://www.example.com/">
  <resource path="service/{id}.json" id="service_id_json">
    <param name="Authorization" style="header"/>
    <param name="id" style="template" type="plain"/>
    <method name="DELETE" id="DELETE-service_id_json">
      <request></request>
      <response></response>
    </method>
    <method name="GET" id="GET-service_id_json">
      <request></request>
      <response>
        <representation mediaType="application/json"/>
      </response>
    </method>
  </resource>
</resources>"#,
    );
    let service = app.resource("service_id_json").unwrap();
    let bindings = Bindings::new().path("id", 42i64);
    let expected = "http://www.example.com/service/42.json";

    // Without credentials: the header param stays unbound.
    let plain = service.bind(&bindings).unwrap().uri(&Bindings::new()).unwrap();
    assert_eq!(plain.to_string(), expected);
    assert_eq!(plain.header("Authorization"), None);

    // With credentials: the header appears, the URI is unaffected.
    let authed = service
        .with_basic_auth("u", "p")
        .bind(&bindings)
        .unwrap()
        .uri(&Bindings::new())
        .unwrap();
    assert_eq!(authed.to_string(), expected);
    assert_eq!(authed.header("Authorization"), Some("Basic dTpw"));
}

#[test]
fn malformed_descriptions_fail_the_load() {
    // Missing required attribute.
    let result = Application::from_xml(
        r#"<application><resources><resource><param style="query"/></resource></resources></application>"#,
    );
    assert!(matches!(result, Err(Error::Description(_))));

    // Duplicate single child.
    let result = Application::from_xml(
        r#"<application><method id="m" name="GET"><request/><request/></method></application>"#,
    );
    assert!(matches!(result, Err(Error::Description(_))));

    // Not XML at all.
    assert!(Application::from_xml("junk <<<").is_err());
}

#[test]
fn dangling_reference_is_absent_not_an_error() {
    let app = wadl(
        r##"
<resources base="http://www.example.com/">
  <resource id="green" path="green">
    <resource href="#nowhere" />
  </resource>
</resources>"##,
    );
    let green = app.find_resource("green").unwrap();
    assert!(green.find_resource("nowhere").is_none());
}

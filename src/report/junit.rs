//! JUnit XML report

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::common::{Error, Result};
use crate::testing::result::{CaseStatus, SuiteResult, TestCaseResult, TestRunResult};

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::Report(format!("JUnit XML: {}", e))
}

/// Render a run as JUnit XML: one `<testsuite>` per suite
pub fn render(run: &TestRunResult) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut suites = BytesStart::new("testsuites");
    suites.push_attribute(("name", "automatos-api-tests"));
    suites.push_attribute(("tests", run.total.to_string().as_str()));
    suites.push_attribute(("failures", run.failed.to_string().as_str()));
    suites.push_attribute(("skipped", run.skipped.to_string().as_str()));
    suites.push_attribute(("time", format!("{:.3}", run.duration).as_str()));
    writer.write_event(Event::Start(suites)).map_err(xml_error)?;

    for suite in &run.suites {
        write_suite(&mut writer, run, suite)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("testsuites")))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_error)
}

fn write_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    run: &TestRunResult,
    suite: &SuiteResult,
) -> Result<()> {
    let mut start = BytesStart::new("testsuite");
    start.push_attribute(("name", suite.name.as_str()));
    start.push_attribute(("id", run.run_id.as_str()));
    start.push_attribute(("tests", suite.total.to_string().as_str()));
    start.push_attribute(("failures", suite.failed.to_string().as_str()));
    start.push_attribute(("skipped", suite.skipped.to_string().as_str()));
    start.push_attribute(("time", format!("{:.3}", suite.duration).as_str()));
    start.push_attribute(("timestamp", run.started_at.to_rfc3339().as_str()));
    writer.write_event(Event::Start(start)).map_err(xml_error)?;

    for case in &suite.cases {
        write_case(writer, suite, case)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("testsuite")))
        .map_err(xml_error)?;
    Ok(())
}

fn write_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite: &SuiteResult,
    case: &TestCaseResult,
) -> Result<()> {
    let classname = format!("{}.{}", suite.level, suite.name);
    let mut start = BytesStart::new("testcase");
    start.push_attribute(("name", case.name.as_str()));
    start.push_attribute(("classname", classname.as_str()));
    start.push_attribute(("time", format!("{:.3}", case.duration).as_str()));

    match case.status {
        CaseStatus::Passed => {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            return Ok(());
        }
        CaseStatus::Failed => {
            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            let message = case.error_message.as_deref().unwrap_or("failed");
            let mut failure = BytesStart::new("failure");
            failure.push_attribute(("message", message));
            failure.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(failure)).map_err(xml_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&format!(
                    "{} {}: {}",
                    case.method, case.path, message
                ))))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new("failure")))
                .map_err(xml_error)?;
        }
        CaseStatus::Skipped => {
            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            let mut skipped = BytesStart::new("skipped");
            if let Some(reason) = &case.error_message {
                skipped.push_attribute(("message", reason.as_str()));
            }
            writer.write_event(Event::Empty(skipped)).map_err(xml_error)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("testcase")))
        .map_err(xml_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_run;

    #[test]
    fn test_generate_junit_xml() {
        let xml = render(&sample_run()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<testsuites name="automatos-api-tests" tests="3" failures="1" skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="documents""#));
        assert!(xml.contains(r#"<testcase name="list documents" classname="integration.documents""#));
        assert!(xml.contains(r#"<failure message="Test assertion failed: GET /api/documents/analytics/overview: expected status 200, got HTTP 500"#));
        assert!(xml.contains(r#"<skipped message="unresolved variable"#));
    }
}

use std::path::Path;

use reqwest::Method;
use serde_json::Value;

use crate::cli::ApiArgs;
use crate::client::JiraClient;
use crate::error::{JiraError, Result};
use crate::output;

/// Inline JSON when it looks like an object, otherwise a file holding it.
fn payload(data: &str) -> Result<Value> {
    if data.trim_start().starts_with('{') {
        return Ok(serde_json::from_str(data)?);
    }
    let path = Path::new(data);
    if !path.exists() {
        return Err(JiraError::FileNotFound(path.to_path_buf()));
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn method(name: &str) -> Result<Method> {
    Method::from_bytes(name.to_uppercase().as_bytes()).map_err(|_| JiraError::InvalidValue {
        attribute: "method".to_string(),
        value: name.to_string(),
    })
}

pub async fn run(client: &JiraClient, args: ApiArgs) -> Result<()> {
    let method = method(&args.method)?;
    let payload = args.data.as_deref().map(payload).transpose()?;
    let response = client.call(method, &args.uri, payload.as_ref()).await?;
    output::print_json(&response.unwrap_or(Value::Null));
    Ok(())
}

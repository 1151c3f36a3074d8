use crate::{
    Error,
    Result,
};
use reqwest::{
    StatusCode,
    header,
};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// JSON-over-HTTP client bound to the lobby backend's origin. Paths are
/// resolved origin-relative.
#[derive(Clone, Debug)]
pub struct JsonTransport {
    origin: Url,
    http: reqwest::Client,
}

impl JsonTransport {
    pub fn new(origin: Url) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { origin, http })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.origin.join(path)?)
    }

    /// Endpoint under the collection `path` for one item. `segment` is
    /// percent-encoded as a single path segment, so `/`, `?` and `#` inside
    /// it cannot change the route.
    pub fn item_endpoint(&self, path: &str, segment: &str) -> Result<Url> {
        if matches!(segment, "" | "." | "..") {
            return Err(Error::InvalidPathSegment(segment.to_owned()));
        }
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    pub async fn post_json<T>(&self, path: &str, payload: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let body = serde_json::to_vec(payload)?;
        tracing::debug!(%url, "POST");
        let res = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn get_json(&self, path: &str) -> Result<Value> {
        self.get_json_at(self.endpoint(path)?).await
    }

    pub async fn get_json_at(&self, url: Url) -> Result<Value> {
        tracing::debug!(%url, "GET");
        let res = self.http.get(url).send().await?;
        read_json(res).await
    }
}

async fn read_json(res: reqwest::Response) -> Result<Value> {
    let status = res.status();
    let bytes = res.bytes().await?;
    if !status.is_success() {
        return Err(http_error(status, &bytes));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn http_error(status: StatusCode, body: &[u8]) -> Error {
    Error::Http {
        status: status.as_u16(),
        message: String::from_utf8_lossy(body).into_owned(),
    }
}

/// JavaScript truthiness of an optional JSON value.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

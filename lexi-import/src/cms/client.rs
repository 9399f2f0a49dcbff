//! WordPress REST client
//!
//! Collections live under `/wp-json/wp/v2/{collection}`; the bulk-import
//! and structure routes live under `/wp-json/{import_namespace}/...`.
//! No retry policy: every failure is returned to the caller.

use async_trait::async_trait;
use lexi_common::config::CmsSettings;
use lexi_common::AuthContext;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    CmsError, CmsRecord, ContentRepository, ContentType, ListQuery, MediaFile, RemoteNode,
    RemoteStructure,
};
use crate::models::{ImportEndpoint, NodeType};

const USER_AGENT: &str = concat!("lexi-import/", env!("CARGO_PKG_VERSION"));

/// `title` / `content` come back either rendered (`{"rendered": ".."}`) or plain
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextField {
    Rendered { rendered: String },
    Plain(String),
}

impl TextField {
    fn into_text(self) -> String {
        match self {
            TextField::Rendered { rendered } => rendered,
            TextField::Plain(s) => s,
        }
    }
}

/// Post as returned by the REST API
#[derive(Debug, Deserialize)]
struct WpPost {
    id: u64,
    #[serde(default)]
    title: Option<TextField>,
    #[serde(default)]
    content: Option<TextField>,
    /// Object, or `[]`/`false` when the post has no custom fields
    #[serde(default)]
    acf: Value,
}

impl From<WpPost> for CmsRecord {
    fn from(post: WpPost) -> Self {
        let acf = match post.acf {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        CmsRecord {
            id: post.id,
            title: post.title.map(TextField::into_text).unwrap_or_default(),
            content: post.content.map(TextField::into_text),
            acf,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WpStructureNode {
    id: u64,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    title: Option<TextField>,
    #[serde(default)]
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WpStructure {
    legislation: WpPost,
    #[serde(default)]
    nodes: Vec<WpStructureNode>,
}

/// CMS REST client
pub struct CmsClient {
    http_client: reqwest::Client,
    settings: CmsSettings,
}

impl CmsClient {
    pub fn new(settings: CmsSettings) -> Result<Self, CmsError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| CmsError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn collection_url(&self, content_type: ContentType) -> String {
        format!(
            "{}/wp-json/wp/v2/{}",
            self.settings.base_url,
            content_type.endpoint()
        )
    }

    fn custom_url(&self, path: &str) -> String {
        format!(
            "{}/wp-json/{}/{}",
            self.settings.base_url, self.settings.import_namespace, path
        )
    }

    fn media_url(&self) -> String {
        format!("{}/wp-json/wp/v2/media", self.settings.base_url)
    }

    fn authorized(request: RequestBuilder, auth: &AuthContext) -> Result<RequestBuilder, CmsError> {
        match auth.bearer() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(CmsError::Unauthorized("no CMS token available".to_string())),
        }
    }

    async fn send(request: RequestBuilder, what: &str) -> Result<Response, CmsError> {
        let response = request
            .send()
            .await
            .map_err(|e| CmsError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => CmsError::NotFound(what.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CmsError::Unauthorized(body),
            _ => CmsError::Api(status.as_u16(), body),
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, CmsError> {
        response
            .json::<T>()
            .await
            .map_err(|e| CmsError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ContentRepository for CmsClient {
    async fn list_by_type(
        &self,
        content_type: ContentType,
        query: &ListQuery,
    ) -> Result<Vec<CmsRecord>, CmsError> {
        let url = self.collection_url(content_type);
        let mut params: Vec<(String, String)> = vec![
            ("page".to_string(), query.page.to_string()),
            ("per_page".to_string(), query.per_page.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search".to_string(), search.clone()));
        }
        params.extend(query.filters.iter().cloned());

        tracing::debug!(url = %url, page = query.page, "Listing CMS records");

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| CmsError::Network(e.to_string()))?;

        // Past the last page WordPress answers 400 rest_post_invalid_page_number
        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if body.contains("rest_post_invalid_page_number") {
                return Ok(Vec::new());
            }
            return Err(CmsError::Api(400, body));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CmsError::Api(status, body));
        }

        let posts: Vec<WpPost> = Self::parse(response).await?;
        Ok(posts.into_iter().map(CmsRecord::from).collect())
    }

    async fn get_by_id(
        &self,
        content_type: ContentType,
        id: u64,
    ) -> Result<Option<CmsRecord>, CmsError> {
        let url = format!("{}/{}", self.collection_url(content_type), id);
        tracing::debug!(url = %url, "Fetching CMS record");

        match Self::send(self.http_client.get(&url), &url).await {
            Ok(response) => {
                let post: WpPost = Self::parse(response).await?;
                Ok(Some(post.into()))
            }
            Err(CmsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_record(
        &self,
        content_type: ContentType,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<u64, CmsError> {
        let url = self.collection_url(content_type);
        let request = Self::authorized(self.http_client.post(&url).json(payload), auth)?;
        let created: CreatedId = Self::parse(Self::send(request, &url).await?).await?;

        tracing::info!(collection = content_type.endpoint(), id = created.id, "Created CMS record");
        Ok(created.id)
    }

    async fn update_record(
        &self,
        content_type: ContentType,
        id: u64,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<CmsRecord, CmsError> {
        let url = format!("{}/{}", self.collection_url(content_type), id);
        let request = Self::authorized(self.http_client.post(&url).json(payload), auth)?;
        let post: WpPost = Self::parse(Self::send(request, &url).await?).await?;

        tracing::debug!(collection = content_type.endpoint(), id, "Updated CMS record");
        Ok(post.into())
    }

    async fn upload_media(
        &self,
        file: &MediaFile,
        title: &str,
        auth: &AuthContext,
    ) -> Result<u64, CmsError> {
        let url = self.media_url();
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| CmsError::Parse(e.to_string()))?;
        let form = Form::new().part("file", part).text("title", title.to_string());

        let request = Self::authorized(self.http_client.post(&url).multipart(form), auth)?;
        let created: CreatedId = Self::parse(Self::send(request, &url).await?).await?;

        tracing::info!(media_id = created.id, file = %file.file_name, "Uploaded media");
        Ok(created.id)
    }

    async fn submit_import(
        &self,
        endpoint: ImportEndpoint,
        file: &MediaFile,
        auth: &AuthContext,
    ) -> Result<(), CmsError> {
        let url = self.custom_url(endpoint.path());
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| CmsError::Parse(e.to_string()))?;
        let form = Form::new().part("file", part);

        tracing::info!(url = %url, file = %file.file_name, "Submitting import file");

        let request = Self::authorized(self.http_client.post(&url).multipart(form), auth)?;
        Self::send(request, &url).await?;
        Ok(())
    }

    async fn fetch_structure(&self, legislation_id: u64) -> Result<RemoteStructure, CmsError> {
        let url = self.custom_url(&format!("legislations/{}/structure", legislation_id));
        tracing::debug!(url = %url, "Fetching legislation structure");

        let body: WpStructure = Self::parse(Self::send(self.http_client.get(&url), &url).await?).await?;

        let mut nodes = Vec::with_capacity(body.nodes.len());
        for node in body.nodes {
            let node_type: NodeType = node.node_type.parse().map_err(CmsError::Parse)?;
            nodes.push(RemoteNode {
                id: node.id,
                node_type,
                title: node.title.map(TextField::into_text).unwrap_or_default(),
                position: node.position,
            });
        }

        Ok(RemoteStructure {
            legislation: body.legislation.into(),
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> CmsSettings {
        CmsSettings {
            base_url: "https://cms.example.org".to_string(),
            import_namespace: "lexi/v1".to_string(),
            request_timeout: None,
            page_size: 50,
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(CmsClient::new(settings()).is_ok());
    }

    #[test]
    fn test_urls() {
        let client = CmsClient::new(settings()).unwrap();
        assert_eq!(
            client.collection_url(ContentType::Article),
            "https://cms.example.org/wp-json/wp/v2/articles"
        );
        assert_eq!(
            client.custom_url(ImportEndpoint::Complet.path()),
            "https://cms.example.org/wp-json/lexi/v1/import/complet"
        );
        assert_eq!(client.media_url(), "https://cms.example.org/wp-json/wp/v2/media");
    }

    #[test]
    fn test_wp_post_conversion() {
        let post: WpPost = serde_json::from_value(json!({
            "id": 42,
            "title": {"rendered": "Article 5"},
            "content": {"rendered": "<p>Texte</p>"},
            "acf": {"date_entree": "20200101", "legislation": [7]}
        }))
        .unwrap();
        let record: CmsRecord = post.into();
        assert_eq!(record.id, 42);
        assert_eq!(record.title, "Article 5");
        assert_eq!(record.content.as_deref(), Some("<p>Texte</p>"));
        assert_eq!(record.field_ids("legislation"), vec![7]);
    }

    #[test]
    fn test_wp_post_without_custom_fields() {
        let post: WpPost = serde_json::from_value(json!({
            "id": 1,
            "title": "plain title",
            "acf": []
        }))
        .unwrap();
        let record: CmsRecord = post.into();
        assert_eq!(record.title, "plain title");
        assert!(record.acf.is_empty());
    }

    #[test]
    fn test_missing_token_is_rejected_before_sending() {
        let client = CmsClient::new(settings()).unwrap();
        let request = client.http_client.post(client.media_url());
        let result = CmsClient::authorized(request, &AuthContext::anonymous());
        assert!(matches!(result, Err(CmsError::Unauthorized(_))));
    }
}

//! Wiki payload builders and mock responders.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use zzz_datagen::Language;
use zzz_datagen::model::{CHECKPOINTS, StatKind};

/// A character page as the wiki API serves it.
#[derive(Debug, Clone)]
pub struct CharacterPage {
    pub language: Language,
    pub name: String,
    pub levels: Vec<u32>,
    pub icon_url: Option<String>,
}

impl CharacterPage {
    pub fn new(language: Language, name: &str) -> Self {
        Self {
            language,
            name: name.to_string(),
            levels: CHECKPOINTS.to_vec(),
            icon_url: None,
        }
    }

    pub fn with_levels(mut self, levels: &[u32]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    pub fn with_icon(mut self, url: &str) -> Self {
        self.icon_url = Some(url.to_string());
        self
    }

    /// HP after ascension at a checkpoint.
    pub fn hp_at(level: u32) -> f64 {
        f64::from(level * 10 + 1)
    }

    pub fn to_json(&self) -> String {
        let base_info = match self.language {
            Language::ZhCn => json!([
                {"key": "名称", "value": [self.name]},
                {"key": "阵营", "value": ["<p>狡兔屋</p>"]},
                {"key": "稀有度", "value": ["A级"]},
                {"key": "特性", "value": ["击破"]},
                {"key": "属性", "value": ["电属性"]},
                {"key": "攻击类型", "value": ["斩击"]}
            ]),
            Language::EnUs => json!([
                {"key": "Name", "value": [self.name]},
                {"key": "Faction", "value": ["Cunning Hares"]},
                {"key": "Rarity", "value": ["A"]},
                {"key": "Specialty", "value": ["Stun"]},
                {"key": "Attribute", "value": ["Electric"]},
                {"key": "Attack Type", "value": ["Slash"]}
            ]),
        };
        let rows: Vec<_> = self
            .levels
            .iter()
            .map(|level| {
                let cells: Vec<_> = StatKind::ALL
                    .iter()
                    .map(|stat| {
                        let label = stat.labels(self.language)[0];
                        json!({"key": label, "values": [
                            (level * 10).to_string(),
                            (level * 10 + 1).to_string()
                        ]})
                    })
                    .collect();
                json!({"key": format!("Lv.{level}"), "combatList": cells})
            })
            .collect();

        json!({"retcode": 0, "message": "OK", "data": {"page": {
            "name": self.name,
            "icon_url": self.icon_url,
            "desc": "Deals <b>Electric DMG</b> and builds Daze.",
            "modules": [{"name": "Attributes", "components": [
                {"component_id": "baseInfo", "data": json!({"list": base_info}).to_string()},
                {"component_id": "ascension", "data": json!({"list": rows}).to_string()}
            ]}]
        }}})
        .to_string()
    }
}

/// Answers per `x-rpc-language` header, failing the first `fail_first`
/// requests with 500.
pub struct LanguageResponder {
    pages: HashMap<&'static str, String>,
    fail_first: usize,
    requests: Arc<AtomicUsize>,
}

impl LanguageResponder {
    pub fn new(pages: &[CharacterPage]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|page| (page.language.code(), page.to_json()))
                .collect(),
            fail_first: 0,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_first(mut self, count: usize) -> Self {
        self.fail_first = count;
        self
    }

    pub fn request_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.requests)
    }
}

impl Respond for LanguageResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return ResponseTemplate::new(500).set_body_string("upstream error");
        }
        let language = request
            .headers
            .get("x-rpc-language")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        match self.pages.get(language) {
            Some(body) => ResponseTemplate::new(200).set_body_string(body.clone()),
            None => ResponseTemplate::new(200)
                .set_body_string(r#"{"retcode":-1,"message":"language unavailable","data":null}"#),
        }
    }
}

/// Mounts `responder` for one wiki entry id.
pub async fn mount_entry(server: &MockServer, remote_id: u64, responder: LanguageResponder) {
    Mock::given(method("GET"))
        .and(path("/entry_page"))
        .and(query_param("entry_page_id", remote_id.to_string()))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// Serves bilingual pages for one entry.
pub async fn mount_character(server: &MockServer, remote_id: u64, zh_name: &str, en_name: &str) {
    mount_entry(
        server,
        remote_id,
        LanguageResponder::new(&[
            CharacterPage::new(Language::ZhCn, zh_name),
            CharacterPage::new(Language::EnUs, en_name),
        ]),
    )
    .await;
}

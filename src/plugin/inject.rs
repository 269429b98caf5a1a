//! Injectable head content contributed by plugins.

use serde::Serialize;

/// One unit of page-head content.
#[derive(Debug, Clone, Serialize)]
pub struct InjectableTag {
    /// Critical tags are emitted before non-critical ones in a page's
    /// head.
    pub critical: bool,
    pub kind: TagKind,
}

/// The tag payload.
///
/// The pipeline only ever reads the `critical` flag; everything here
/// passes through to the page untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag_type", rename_all = "snake_case")]
pub enum TagKind {
    Stylesheet {
        href: String,
    },
    Link {
        rel: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        link_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sizes: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        media: Option<String>,
        href: String,
    },
    Meta {
        name: String,
        content: String,
    },
}

impl InjectableTag {
    /// A `<link rel="stylesheet">` tag.
    pub fn stylesheet(href: impl Into<String>) -> Self {
        Self {
            critical: false,
            kind: TagKind::Stylesheet { href: href.into() },
        }
    }

    /// A generic `<link>` tag. Optional attributes via the `Link`
    /// variant directly.
    pub fn link(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            critical: false,
            kind: TagKind::Link {
                rel: rel.into(),
                link_type: None,
                title: None,
                sizes: None,
                media: None,
                href: href.into(),
            },
        }
    }

    /// A `<meta name content>` tag.
    pub fn meta(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            critical: false,
            kind: TagKind::Meta {
                name: name.into(),
                content: content.into(),
            },
        }
    }

    /// Mark the tag critical.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Render the head HTML for this tag.
    pub fn render(&self) -> String {
        match &self.kind {
            TagKind::Stylesheet { href } => {
                format!(r#"<link rel="stylesheet" href="{}">"#, escape_attr(href))
            }
            TagKind::Link {
                rel,
                link_type,
                title,
                sizes,
                media,
                href,
            } => {
                let mut tag = format!(r#"<link rel="{}""#, escape_attr(rel));
                for (attr, value) in [
                    ("type", link_type),
                    ("title", title),
                    ("sizes", sizes),
                    ("media", media),
                ] {
                    if let Some(value) = value {
                        tag.push_str(&format!(r#" {attr}="{}""#, escape_attr(value)));
                    }
                }
                tag.push_str(&format!(r#" href="{}">"#, escape_attr(href)));
                tag
            }
            TagKind::Meta { name, content } => format!(
                r#"<meta name="{}" content="{}">"#,
                escape_attr(name),
                escape_attr(content)
            ),
        }
    }
}

/// Minimal escaping for double-quoted HTML attribute values.
fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Aggregated tags, partitioned by criticality.
///
/// Each bucket preserves plugin declaration order first, per-plugin
/// tag order second.
#[derive(Debug, Clone, Default)]
pub struct InjectableSet {
    pub critical: Vec<InjectableTag>,
    pub deferred: Vec<InjectableTag>,
}

impl InjectableSet {
    pub(crate) fn push(&mut self, tag: InjectableTag) {
        if tag.critical {
            self.critical.push(tag);
        } else {
            self.deferred.push(tag);
        }
    }

    /// Tags in head-emission order: critical first.
    pub fn iter(&self) -> impl Iterator<Item = &InjectableTag> {
        self.critical.iter().chain(self.deferred.iter())
    }

    /// Render the whole set as head HTML, one tag per line.
    pub fn render_head(&self) -> String {
        self.iter()
            .map(InjectableTag::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.deferred.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stylesheet() {
        assert_eq!(
            InjectableTag::stylesheet("/assets/index.abcd1234.css").render(),
            r#"<link rel="stylesheet" href="/assets/index.abcd1234.css">"#
        );
    }

    #[test]
    fn test_render_link_with_optional_attrs() {
        let tag = InjectableTag {
            critical: false,
            kind: TagKind::Link {
                rel: "icon".into(),
                link_type: Some("image/png".into()),
                title: None,
                sizes: Some("32x32".into()),
                media: None,
                href: "/favicon-32.png".into(),
            },
        };
        assert_eq!(
            tag.render(),
            r#"<link rel="icon" type="image/png" sizes="32x32" href="/favicon-32.png">"#
        );
    }

    #[test]
    fn test_render_meta_escapes() {
        assert_eq!(
            InjectableTag::meta("description", r#"a "quoted" <site>"#).render(),
            r#"<meta name="description" content="a &quot;quoted&quot; &lt;site>">"#
        );
    }

    #[test]
    fn test_set_partitions_and_orders() {
        let mut set = InjectableSet::default();
        set.push(InjectableTag::stylesheet("/a.css").critical());
        set.push(InjectableTag::meta("generator", "ferrite"));
        set.push(InjectableTag::link("icon", "/c.png").critical());

        assert_eq!(set.critical.len(), 2);
        assert_eq!(set.deferred.len(), 1);

        let rendered: Vec<_> = set.iter().map(InjectableTag::render).collect();
        assert!(rendered[0].contains("/a.css"));
        assert!(rendered[1].contains("/c.png"));
        assert!(rendered[2].contains("generator"));
    }
}

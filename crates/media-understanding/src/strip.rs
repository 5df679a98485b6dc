use clawline_common::types::MsgContext;

use crate::capability::MediaCapability;

/// Remove raw attachment references from `ctx` and replace every
/// `<media:{capability}>` placeholder in the body with a "not processed"
/// notice. An absent body stays absent.
pub fn strip_media_from_prompt(ctx: &mut MsgContext, capability: MediaCapability) {
    ctx.media_path = None;
    ctx.media_paths = None;
    ctx.media_urls = None;
    if let Some(body) = ctx.body.as_mut() {
        *body = body.replace(&capability.placeholder(), &capability.unprocessed_notice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_own_placeholder() {
        let mut ctx = MsgContext {
            body: Some("<media:image> <media:audio> <media:image>".into()),
            media_urls: Some(vec!["https://example.com/a.png".into()]),
            media_type: Some("image/png".into()),
            ..Default::default()
        };
        strip_media_from_prompt(&mut ctx, MediaCapability::Image);
        assert_eq!(
            ctx.body.as_deref(),
            Some("[image received - not processed] <media:audio> [image received - not processed]")
        );
        assert!(ctx.media_urls.is_none());
        assert_eq!(ctx.media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn placeholder_match_is_case_sensitive() {
        let mut ctx = MsgContext {
            body: Some("<MEDIA:IMAGE>".into()),
            ..Default::default()
        };
        strip_media_from_prompt(&mut ctx, MediaCapability::Image);
        assert_eq!(ctx.body.as_deref(), Some("<MEDIA:IMAGE>"));
    }
}

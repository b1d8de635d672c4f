//! HTML fragments emitted by the media shortcodes.

use crate::imaging::{ImageBuildResult, Variant};
use maud::{Markup, html};

/// `url 600w, url 1200w`
fn srcset(variants: &[Variant]) -> String {
    variants
        .iter()
        .map(|v| format!("{} {}w", v.url, v.width))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrap media in `figure` with a caption, or a plain `div`, both with `class`.
fn wrap(class: &str, caption: Option<&str>, media: Markup) -> Markup {
    html! {
        @if let Some(caption) = caption {
            figure class=(class) {
                (media)
                figcaption { (caption) }
            }
        } @else {
            div class=(class) { (media) }
        }
    }
}

/// Responsive image markup for a processed source.
///
/// The last format is the `<img>` fallback; any earlier formats become
/// `<source>` elements of a `<picture>`. `sizes` only applies when there is
/// more than one width.
pub(crate) fn image(
    result: &ImageBuildResult,
    alt: &str,
    sizes: Option<&str>,
    caption: Option<&str>,
) -> Markup {
    let Some((fallback, modern)) = result.formats.split_last() else {
        return wrap("image", caption, html! {});
    };
    let variants = fallback.variants.as_slice();
    let (Some(smallest), Some(largest)) = (variants.first(), variants.last()) else {
        return wrap("image", caption, html! {});
    };
    let responsive = variants.len() > 1;
    let sizes = sizes.filter(|_| responsive);

    let img = html! {
        img alt=(alt)
            src=(smallest.url)
            width=(largest.width)
            height=(largest.height)
            srcset=[responsive.then(|| srcset(variants))]
            sizes=[sizes]
            loading="lazy"
            decoding="async";
    };

    let media = if modern.is_empty() {
        img
    } else {
        html! {
            picture {
                @for format in modern {
                    source type=(format.format.mime_type())
                        srcset=(srcset(&format.variants))
                        sizes=[sizes];
                }
                (img)
            }
        }
    };

    wrap("image", caption, media)
}

/// Deferred-loading video markup; `static/lazy-video.js` swaps `data-src` in.
pub(crate) fn video(url: &str, mime_type: &str, caption: Option<&str>) -> Markup {
    let media = html! {
        video class="lazy" autoplay muted loop playsinline preload="none" {
            source data-src=(url) type=(mime_type);
        }
    };
    wrap("video", caption, media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Dimensions, FormatVariants, OutputFormat, SourceInfo, VariantStatus};

    fn variant(format: OutputFormat, width: u32, height: u32) -> Variant {
        let file_name = format!("abc-{width}.{}", format.extension());
        Variant {
            format,
            width,
            height,
            url: format!("/img/{file_name}"),
            file_name,
            status: VariantStatus::Encoded,
        }
    }

    fn result(formats: &[OutputFormat], widths: &[u32]) -> ImageBuildResult {
        ImageBuildResult {
            source: SourceInfo {
                dimensions: Dimensions { width: 2400, height: 1200 },
                format: Some(OutputFormat::Jpeg),
                animated: false,
            },
            formats: formats
                .iter()
                .map(|&format| FormatVariants {
                    format,
                    variants: widths.iter().map(|&w| variant(format, w, w / 2)).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn single_format_is_bare_img() {
        let html = image(&result(&[OutputFormat::Jpeg], &[800]), "alt", None, None).into_string();
        assert!(!html.contains("<picture>"));
        assert!(html.contains(r#"src="/img/abc-800.jpeg""#));
        assert!(html.contains(r#"width="800""#));
        assert!(html.contains(r#"height="400""#));
    }

    #[test]
    fn img_defers_loading_and_decoding() {
        let html = image(&result(&[OutputFormat::Jpeg], &[800]), "alt", None, None).into_string();
        assert!(html.contains(r#"loading="lazy""#));
        assert!(html.contains(r#"decoding="async""#));
    }

    #[test]
    fn single_width_has_no_srcset() {
        let html = image(
            &result(&[OutputFormat::Webp, OutputFormat::Jpeg], &[800]),
            "alt",
            Some("100vw"),
            None,
        )
        .into_string();
        assert!(!html.contains("sizes="));
        assert!(!html.contains("abc-800.jpeg 800w"));
    }

    #[test]
    fn multiple_formats_use_picture_with_sources() {
        let html = image(
            &result(&[OutputFormat::Webp, OutputFormat::Jpeg], &[600, 1200]),
            "alt",
            Some("50vw"),
            None,
        )
        .into_string();
        assert!(html.contains("<picture>"));
        assert!(html.contains(
            r#"<source type="image/webp" srcset="/img/abc-600.webp 600w, /img/abc-1200.webp 1200w" sizes="50vw">"#
        ));
        assert!(html.contains(r#"srcset="/img/abc-600.jpeg 600w, /img/abc-1200.jpeg 1200w""#));
    }

    #[test]
    fn img_uses_smallest_src_and_largest_dimensions() {
        let html = image(&result(&[OutputFormat::Png], &[300, 900]), "alt", Some("100vw"), None)
            .into_string();
        assert!(html.contains(r#"src="/img/abc-300.png""#));
        assert!(html.contains(r#"width="900""#));
        assert!(html.contains(r#"height="450""#));
    }

    #[test]
    fn caption_wraps_in_figure() {
        let html = image(&result(&[OutputFormat::Jpeg], &[800]), "alt", None, Some("A cat"))
            .into_string();
        assert!(html.starts_with(r#"<figure class="image">"#));
        assert!(html.contains("<figcaption>A cat</figcaption>"));
    }

    #[test]
    fn no_caption_wraps_in_div() {
        let html = image(&result(&[OutputFormat::Jpeg], &[800]), "alt", None, None).into_string();
        assert!(html.starts_with(r#"<div class="image">"#));
        assert!(!html.contains("figcaption"));
    }

    #[test]
    fn text_is_escaped() {
        let html = image(
            &result(&[OutputFormat::Jpeg], &[800]),
            "a \"quoted\" <alt>",
            None,
            Some("<b>bold</b>"),
        )
        .into_string();
        assert!(html.contains("a &quot;quoted&quot; &lt;alt&gt;"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }

    #[test]
    fn video_sources_are_deferred() {
        let html = video("/video/abc-clip.mp4", "video/mp4", None).into_string();
        assert!(html.starts_with(r#"<div class="video">"#));
        assert!(html.contains(r#"<video class="lazy" autoplay muted loop playsinline preload="none">"#));
        assert!(html.contains(r#"<source data-src="/video/abc-clip.mp4" type="video/mp4">"#));
        assert!(!html.contains(" src="));
    }

    #[test]
    fn video_caption_wraps_in_figure() {
        let html = video("/v.webm", "video/webm", Some("Loop")).into_string();
        assert!(html.starts_with(r#"<figure class="video">"#));
        assert!(html.contains("<figcaption>Loop</figcaption>"));
    }
}

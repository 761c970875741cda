//! GROQ queries issued by the content routes.
//!
//! Projections are assembled from shared selection fragments so every page
//! expands images, rich text and menus the same way.

macro_rules! rich_image {
    () => {
        "{ ..., alt, caption, asset->{ ..., metadata{ blurHash, dimensions{ width, height, aspectRatio } } } }"
    };
}

macro_rules! rich_text {
    () => {
        r#"[]{ ..., markDefs[]{ ..., _type == "internalLink" => { ..., reference->{ _type, _id, title, slug } } } }"#
    };
}

macro_rules! menu_item {
    () => {
        "{ _key, label, linkType, internalLink->{ _type, _id, title, slug }, externalLink }"
    };
}

macro_rules! press_item {
    () => {
        "{ title, externalLink, file{ asset->{ _id, url, originalFilename, size, mimeType } } }"
    };
}

macro_rules! seo {
    () => {
        concat!("seo{ title, description, image", rich_image!(), " }")
    };
}

macro_rules! lines {
    () => {
        "lines[]{ label, value, link }"
    };
}

pub const HOMEPAGE: &str = concat!(
    r#"*[_type == "homepage"][0]{ title, "#,
    "videos[]{ ..., asset->{ _id, playbackId, status, data } }, ",
    seo!(),
    " }"
);

pub const ABOUT: &str = concat!(
    r#"*[_type == "about"][0]{ "#,
    "richText",
    rich_text!(),
    ", image",
    rich_image!(),
    ", imageText",
    rich_text!(),
    ", ",
    seo!(),
    " }"
);

pub const SITE_SETTINGS: &str = concat!(
    r#"*[_type == "siteSettings"][0]{ "#,
    "mainMenu[]{ ...",
    menu_item!(),
    " }, footerMenu[]{ ...",
    menu_item!(),
    " }, ",
    seo!(),
    " }"
);

pub const RELEASE_SLUGS: &str =
    r#"*[_type == "release" && defined(slug.current)]{ "slug": slug.current }"#;

pub const RELEASES: &str = concat!(
    r#"*[_type == "release"] | order(release_date desc){ "#,
    "_id, title, slug, release_date, published, cover",
    rich_image!(),
    ", coverAlt",
    rich_image!(),
    ", intro, quote }"
);

pub const RELEASE_BY_SLUG: &str = concat!(
    r#"*[_type == "release" && slug.current == $slug][0]{ "#,
    "_id, title, slug, release_date, published, cover",
    rich_image!(),
    ", coverAlt",
    rich_image!(),
    ", intro, quote, embed }"
);

pub const COLLECTION_SLUGS: &str =
    r#"*[_type == "collection" && defined(slug.current)]{ "slug": slug.current }"#;

pub const COLLECTIONS: &str = concat!(
    r#"*[_type == "collection"] | order(_createdAt desc){ "#,
    "_id, title, slug, hero",
    rich_image!(),
    ", ",
    lines!(),
    ", intro",
    rich_text!(),
    r#", releases[]{ ..., _type == "reference" => @->{ _id, title, slug, release_date, published, cover"#,
    rich_image!(),
    " } }, press[]{ ...",
    press_item!(),
    " } }"
);

pub const COLLECTION_BY_SLUG: &str = concat!(
    r#"*[_type == "collection" && slug.current == $slug][0]{ "#,
    "_id, title, slug, hero",
    rich_image!(),
    ", ",
    lines!(),
    ", intro",
    rich_text!(),
    ", ",
    seo!(),
    r#", releases[]{ ..., _type == "reference" => @->{ _id, title, slug, release_date, published, cover"#,
    rich_image!(),
    ", coverAlt",
    rich_image!(),
    ", intro, quote, embed } }, press[]{ ...",
    press_item!(),
    " } }"
);

pub const PROJECT_SLUGS: &str =
    r#"*[_type == "project" && defined(slug.current)]{ "slug": slug.current }"#;

pub const PROJECTS: &str = concat!(
    r#"*[_type == "project"] | order(_createdAt desc){ "#,
    "_id, title, slug, ",
    lines!(),
    ", columns[]{ _key, content",
    rich_text!(),
    " }, gallery[]{ ...",
    rich_image!(),
    " }, images[]{ ...",
    rich_image!(),
    " }, press[]{ ...",
    press_item!(),
    " } }"
);

pub const PROJECT_BY_SLUG: &str = concat!(
    r#"*[_type == "project" && slug.current == $slug][0]{ "#,
    "_id, title, slug, ",
    lines!(),
    ", ",
    seo!(),
    ", columns[]{ _key, content",
    rich_text!(),
    " }, gallery[]{ ...",
    rich_image!(),
    " }, images[]{ ...",
    rich_image!(),
    " }, press[]{ ...",
    press_item!(),
    " } }"
);

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(query: &str) -> bool {
        let mut depth = 0i32;
        for ch in query.chars() {
            match ch {
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    #[test]
    fn every_query_has_balanced_brackets() {
        for query in [
            HOMEPAGE,
            ABOUT,
            SITE_SETTINGS,
            RELEASE_SLUGS,
            RELEASES,
            RELEASE_BY_SLUG,
            COLLECTION_SLUGS,
            COLLECTIONS,
            COLLECTION_BY_SLUG,
            PROJECT_SLUGS,
            PROJECTS,
            PROJECT_BY_SLUG,
        ] {
            assert!(balanced(query), "unbalanced query: {query}");
        }
    }

    #[test]
    fn by_slug_queries_take_a_slug_parameter() {
        for query in [RELEASE_BY_SLUG, COLLECTION_BY_SLUG, PROJECT_BY_SLUG] {
            assert!(query.contains("slug.current == $slug"));
        }
    }
}

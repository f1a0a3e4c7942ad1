//! Sample data for a fresh database
//!
//! Three categories with a handful of pages each. Seeding twice changes
//! nothing: categories are matched by name and pages by title within
//! their category.

use crate::db::repositories::{
    CategoryRepository, PageRepository, SqlxCategoryRepository, SqlxPageRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Category, Page};
use crate::services::slugify;
use anyhow::{Context, Result};

pub struct SeedPage {
    pub title: &'static str,
    pub url: &'static str,
    pub views: i64,
}

pub struct SeedCategory {
    pub name: &'static str,
    pub views: i64,
    pub likes: i64,
    pub pages: &'static [SeedPage],
}

pub const SEED_DATA: &[SeedCategory] = &[
    SeedCategory {
        name: "Python",
        views: 128,
        likes: 64,
        pages: &[
            SeedPage {
                title: "Official Python Tutorial",
                url: "http://docs.python.org/3/tutorial/",
                views: 114,
            },
            SeedPage {
                title: "How to Think like a Computer Scientist",
                url: "http://www.greenteapress.com/thinkpython/",
                views: 53,
            },
            SeedPage {
                title: "Learn Python in 10 Minutes",
                url: "http://www.korokithakis.net/tutorials/python/",
                views: 20,
            },
        ],
    },
    SeedCategory {
        name: "Django",
        views: 64,
        likes: 32,
        pages: &[
            SeedPage {
                title: "Official Django Tutorial",
                url: "https://docs.djangoproject.com/en/2.1/intro/tutorial01/",
                views: 76,
            },
            SeedPage {
                title: "Django Rocks",
                url: "http://www.djangorocks.com/",
                views: 31,
            },
            SeedPage {
                title: "How to Tango with Django",
                url: "http://www.tangowithdjango.com/",
                views: 92,
            },
        ],
    },
    SeedCategory {
        name: "Other Frameworks",
        views: 32,
        likes: 16,
        pages: &[
            SeedPage {
                title: "Bottle",
                url: "http://bottlepy.org/docs/dev/",
                views: 12,
            },
            SeedPage {
                title: "Flask",
                url: "http://flask.pocoo.org",
                views: 27,
            },
        ],
    },
];

/// What a seeding run created
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub pages_created: usize,
    /// `(category, page title)` for every page now present
    pub pages: Vec<(String, String)>,
}

/// Insert the sample data that is not already there
pub async fn populate(pool: &DynDatabasePool) -> Result<SeedReport> {
    let categories = SqlxCategoryRepository::new(pool.clone());
    let pages = SqlxPageRepository::new(pool.clone());
    let mut report = SeedReport::default();

    for seed in SEED_DATA {
        let category = match categories
            .get_by_name(seed.name)
            .await
            .context("Failed to look up category")?
        {
            Some(existing) => existing,
            None => {
                report.categories_created += 1;
                let category = Category::new(seed.name, slugify(seed.name))
                    .with_counters(seed.views, seed.likes);
                categories
                    .create(&category)
                    .await
                    .with_context(|| format!("Failed to create category {}", seed.name))?
            }
        };

        for page in seed.pages {
            if !pages
                .exists_in_category(category.id, page.title)
                .await
                .context("Failed to look up page")?
            {
                pages
                    .create(&Page::new(category.id, page.title, page.url).with_views(page.views))
                    .await
                    .with_context(|| format!("Failed to create page {}", page.title))?;
                report.pages_created += 1;
            }
            report
                .pages
                .push((category.name.clone(), page.title.to_string()));
        }
    }

    Ok(report)
}

use crate::models::Category;

/// Seed entries shipped with the binary. Runtime learning overrides them.
pub const BUILTIN_DOMAINS: &[(&str, Category)] = &[
    // Work
    ("docs.google.com", Category::Work),
    ("drive.google.com", Category::Work),
    ("mail.google.com", Category::Work),
    ("calendar.google.com", Category::Work),
    ("outlook.office.com", Category::Work),
    ("slack.com", Category::Work),
    ("notion.so", Category::Work),
    ("trello.com", Category::Work),
    ("asana.com", Category::Work),
    ("atlassian.net", Category::Work),
    ("zoom.us", Category::Work),
    ("figma.com", Category::Work),
    // Development
    ("github.com", Category::Development),
    ("gitlab.com", Category::Development),
    ("bitbucket.org", Category::Development),
    ("stackoverflow.com", Category::Development),
    ("developer.mozilla.org", Category::Development),
    ("docs.rs", Category::Development),
    ("crates.io", Category::Development),
    ("npmjs.com", Category::Development),
    ("pypi.org", Category::Development),
    ("rust-lang.org", Category::Development),
    ("localhost", Category::Development),
    // Research
    ("scholar.google.com", Category::Research),
    ("arxiv.org", Category::Research),
    ("wikipedia.org", Category::Research),
    ("jstor.org", Category::Research),
    ("researchgate.net", Category::Research),
    ("pubmed.ncbi.nlm.nih.gov", Category::Research),
    ("semanticscholar.org", Category::Research),
    // Learning
    ("coursera.org", Category::Learning),
    ("udemy.com", Category::Learning),
    ("edx.org", Category::Learning),
    ("khanacademy.org", Category::Learning),
    ("duolingo.com", Category::Learning),
    ("freecodecamp.org", Category::Learning),
    ("brilliant.org", Category::Learning),
    // Entertainment
    ("youtube.com", Category::Entertainment),
    ("netflix.com", Category::Entertainment),
    ("twitch.tv", Category::Entertainment),
    ("hulu.com", Category::Entertainment),
    ("disneyplus.com", Category::Entertainment),
    ("spotify.com", Category::Entertainment),
    ("primevideo.com", Category::Entertainment),
    ("imdb.com", Category::Entertainment),
    // Social
    ("facebook.com", Category::Social),
    ("instagram.com", Category::Social),
    ("twitter.com", Category::Social),
    ("x.com", Category::Social),
    ("reddit.com", Category::Social),
    ("tiktok.com", Category::Social),
    ("linkedin.com", Category::Social),
    ("discord.com", Category::Social),
    ("pinterest.com", Category::Social),
    // Shopping
    ("amazon.com", Category::Shopping),
    ("ebay.com", Category::Shopping),
    ("etsy.com", Category::Shopping),
    ("walmart.com", Category::Shopping),
    ("aliexpress.com", Category::Shopping),
    ("target.com", Category::Shopping),
    // News
    ("news.google.com", Category::News),
    ("nytimes.com", Category::News),
    ("bbc.com", Category::News),
    ("cnn.com", Category::News),
    ("theguardian.com", Category::News),
    ("reuters.com", Category::News),
    ("news.ycombinator.com", Category::News),
];

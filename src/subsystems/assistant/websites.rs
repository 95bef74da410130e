//! Static website directory and the open-intent resolver.

/// One catalog entry: spoken name → canonical URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebsiteEntry {
    pub name: &'static str,
    pub url: &'static str,
}

const fn site(name: &'static str, url: &'static str) -> WebsiteEntry {
    WebsiteEntry { name, url }
}

/// Catalog order is the tie-break when several names occur in one command,
/// so `google` wins over `google maps` and `amazon prime` over `amazon`.
pub const CATALOG: &[WebsiteEntry] = &[
    // social
    site("facebook", "https://www.facebook.com"),
    site("instagram", "https://www.instagram.com"),
    site("twitter", "https://www.twitter.com"),
    site("linkedin", "https://www.linkedin.com"),
    site("youtube", "https://www.youtube.com"),
    site("tiktok", "https://www.tiktok.com"),
    site("snapchat", "https://www.snapchat.com"),
    site("reddit", "https://www.reddit.com"),
    site("pinterest", "https://www.pinterest.com"),
    site("whatsapp", "https://web.whatsapp.com"),
    site("telegram", "https://web.telegram.org"),
    site("discord", "https://discord.com"),
    // search
    site("google", "https://www.google.com"),
    site("bing", "https://www.bing.com"),
    site("yahoo", "https://www.yahoo.com"),
    site("duckduckgo", "https://duckduckgo.com"),
    // video
    site("netflix", "https://www.netflix.com"),
    site("amazon prime", "https://www.primevideo.com"),
    site("disney plus", "https://www.disneyplus.com"),
    site("hotstar", "https://www.hotstar.com"),
    site("vimeo", "https://www.vimeo.com"),
    site("dailymotion", "https://www.dailymotion.com"),
    // shopping
    site("amazon", "https://www.amazon.com"),
    site("flipkart", "https://www.flipkart.com"),
    site("myntra", "https://www.myntra.com"),
    site("ajio", "https://www.ajio.com"),
    site("ebay", "https://www.ebay.com"),
    site("walmart", "https://www.walmart.com"),
    site("target", "https://www.target.com"),
    // news
    site("bbc", "https://www.bbc.com"),
    site("cnn", "https://www.cnn.com"),
    site("times of india", "https://timesofindia.indiatimes.com"),
    site("ndtv", "https://www.ndtv.com"),
    site("hindustan times", "https://www.hindustantimes.com"),
    site("wikipedia", "https://www.wikipedia.org"),
    // email
    site("gmail", "https://mail.google.com"),
    site("outlook", "https://outlook.live.com"),
    site("yahoo mail", "https://mail.yahoo.com"),
    site("protonmail", "https://mail.proton.me"),
    // productivity
    site("github", "https://www.github.com"),
    site("stack overflow", "https://stackoverflow.com"),
    site("medium", "https://medium.com"),
    site("quora", "https://www.quora.com"),
    site("notion", "https://www.notion.so"),
    site("trello", "https://trello.com"),
    site("slack", "https://slack.com"),
    site("zoom", "https://zoom.us"),
    site("microsoft teams", "https://teams.microsoft.com"),
    // travel
    site("google maps", "https://maps.google.com"),
    site("booking", "https://www.booking.com"),
    site("makemytrip", "https://www.makemytrip.com"),
    site("goibibo", "https://www.goibibo.com"),
    site("airbnb", "https://www.airbnb.com"),
    // finance
    site("paypal", "https://www.paypal.com"),
    site("paytm", "https://paytm.com"),
    site("phonepe", "https://www.phonepe.com"),
    site("google pay", "https://pay.google.com"),
    // education
    site("coursera", "https://www.coursera.org"),
    site("udemy", "https://www.udemy.com"),
    site("khan academy", "https://www.khanacademy.org"),
    site("edx", "https://www.edx.org"),
    // gaming
    site("steam", "https://store.steampowered.com"),
    site("roblox", "https://www.roblox.com"),
    site("minecraft", "https://www.minecraft.net"),
    site("twitch", "https://www.twitch.tv"),
    // music
    site("spotify", "https://open.spotify.com"),
    site("apple music", "https://music.apple.com"),
    site("soundcloud", "https://soundcloud.com"),
    site("gaana", "https://gaana.com"),
    site("wynk", "https://wynk.in"),
    site("jiosaavn", "https://www.jiosaavn.com"),
];

const OPEN_VERBS: &[&str] = &["open", "go to", "visit"];

/// Name lookup over a fixed catalog.
#[derive(Debug, Clone, Copy)]
pub struct WebsiteDirectory {
    entries: &'static [WebsiteEntry],
}

impl Default for WebsiteDirectory {
    fn default() -> Self {
        Self { entries: CATALOG }
    }
}

impl WebsiteDirectory {
    /// Resolve a normalized command to a catalog entry.
    ///
    /// Commands carrying an open-verb are matched first; bare mentions only
    /// when no verb is present.  Names match as plain substrings.
    pub fn resolve(&self, command: &str) -> Option<&'static WebsiteEntry> {
        let has_verb = OPEN_VERBS.iter().any(|v| command.contains(v));
        let entries: &'static [WebsiteEntry] = self.entries;
        let hit = entries.iter().find(|e| has_verb && command.contains(e.name));
        hit.or_else(|| entries.iter().find(|e| !has_verb && command.contains(e.name)))
    }
}

use chrono::{Days, NaiveDate};
use mensa_feed::{week_of, CachedFeed, WeeklyFeed};

use crate::{format, telegram::Message};

pub const HELP: &str = "Available commands:
/mensa - Get the food for today
/mensaTomorrow - Get the food for tomorrow
/mensaWeek - Get the food for the week
/mensaNextWeek - Get the food for next week
/help - Get this help message
/contact - Send a message to the developer";

const GREETING: &str =
    "Hello! I'm an unofficial bot for the University of Passau. How can I help you today?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Today,
    Tomorrow,
    Week,
    NextWeek,
    Help,
    Contact(String),
    Unknown,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        // reply keyboard buttons send their label
        match text {
            "Food for today" => return Self::Today,
            "Food for tomorrow" => return Self::Tomorrow,
            "Food for the week" => return Self::Week,
            "Food for next week" => return Self::NextWeek,
            _ => {},
        }

        let (word, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        // in groups commands may be addressed as /mensa@SomeBot
        let word = word.split_once('@').map_or(word, |(cmd, _)| cmd);

        match word {
            "/start" => Self::Start,
            "/mensa" | "/mensatoday" | "/mensaToday" | "/m" | "/f"
                | "/food" | "/foodtoday" => Self::Today,
            "/mensatomorrow" | "/mensaTomorrow" | "/mt" | "/ft"
                | "/foodtomorrow" | "/foodTomorrow" => Self::Tomorrow,
            "/mensaWeek" | "/mensaweek" | "/mw" | "/foodweek" => Self::Week,
            "/mensaNextWeek" | "/mensanextweek" | "/mnw" | "/foodnextweek" => Self::NextWeek,
            "/help" => Self::Help,
            "/contact" => Self::Contact(rest.trim().to_string()),
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub chat_id: i64,
    pub text: String,
}

impl Outgoing {
    fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into() }
    }

    fn all(chat_id: i64, texts: Vec<String>) -> Vec<Self> {
        texts.into_iter().map(|v| Self::new(chat_id, v)).collect()
    }

    /// One message per piece that fits telegram's length limit.
    fn split(chat_id: i64, text: &str) -> Vec<Self> {
        Self::all(chat_id, format::split_message(text, format::MESSAGE_LIMIT))
    }
}

/// Answers chat messages. Returns what to send instead of sending it.
#[derive(Clone)]
pub struct Bot {
    feed: CachedFeed,
    admin_chat_id: Option<i64>,
}

impl Bot {
    pub fn new(feed: CachedFeed, admin_chat_id: Option<i64>) -> Self {
        Self { feed, admin_chat_id }
    }

    pub async fn handle_message(&self, message: &Message, today: NaiveDate) -> Vec<Outgoing> {
        // only text messages for now
        let Some(text) = &message.text else { return Vec::new() };
        let chat = message.chat.id;

        let command = Command::parse(text);
        tracing::debug!("chat {chat}, message {}: {command:?}", message.message_id);

        match command {
            Command::Start => vec![Outgoing::new(chat, GREETING)],
            Command::Help => vec![Outgoing::new(chat, HELP)],
            Command::Today => Outgoing::split(chat, &self.day(today).await),
            Command::Tomorrow => {
                let text = match today.checked_add_days(Days::new(1)) {
                    Some(tomorrow) => self.day(tomorrow).await,
                    None => unavailable(),
                };
                Outgoing::split(chat, &text)
            },
            Command::Week => Outgoing::all(chat, self.week(today, false).await),
            Command::NextWeek => Outgoing::all(chat, self.week(today, true).await),
            Command::Contact(text) => self.contact(message, text),
            Command::Unknown => vec![Outgoing::new(chat, "I don't know that command. Try /help")],
        }
    }

    fn contact(&self, message: &Message, text: String) -> Vec<Outgoing> {
        let chat = message.chat.id;

        if text.is_empty() {
            return vec![Outgoing::new(chat,
                "Please provide a message to send to the developer after the command")];
        }
        let Some(admin) = self.admin_chat_id else {
            tracing::warn!("contact message from chat {chat}, but no admin chat is configured");
            return vec![Outgoing::new(chat, "Unable to send message to developer.")];
        };
        let Some(from) = &message.from else {
            return vec![Outgoing::new(chat,
                "Unable to send message to developer. User information is missing.")];
        };

        let username = from.username.as_deref().unwrap_or("<none>");
        let forward = format!(
            "Message from user {} ID={} in ChatID={chat}:\n{}",
            format::escape_markdown(username), from.id, format::escape_markdown(&text),
        );

        let mut out = Outgoing::split(admin, &forward);
        out.push(Outgoing::new(chat, "Message sent to developer."));
        out
    }

    async fn load(&self, week: u32) -> Option<WeeklyFeed> {
        match self.feed.get_week(week).await {
            Ok(feed) => Some(feed),
            Err(err) => {
                tracing::error!("could not load week {week}: {err}");
                None
            },
        }
    }

    async fn day(&self, date: NaiveDate) -> String {
        let Ok(week) = week_of(date) else { return unavailable() };
        match self.load(week.week).await {
            Some(feed) => format::markdown_day(&feed, date),
            None => unavailable(),
        }
    }

    async fn week(&self, today: NaiveDate, next: bool) -> Vec<String> {
        let week = week_of(today).and_then(|w| if next { w.next() } else { Ok(w) });
        let Ok(week) = week else { return vec![unavailable()] };

        match self.load(week.week).await {
            Some(feed) => format::markdown_week(&feed, week.week),
            None => vec![unavailable()],
        }
    }
}

fn unavailable() -> String {
    "Sorry, I could not load the menu right now. Please try again later.".into()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use mensa_feed::{FeedError, FeedSource, MealEntry, MealPrice, MemoryCache, Price};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::telegram::{Chat, User};

    /// Serves one entry per weekday of the requested 2024 week.
    #[derive(Default)]
    struct FakeSource {
        requested: Mutex<Vec<u32>>,
        fail: bool,
        /// a dozen long dishes per day instead of one
        full: bool,
    }

    #[async_trait]
    impl FeedSource for FakeSource {
        async fn fetch_week(&self, week: u32) -> Result<WeeklyFeed, FeedError> {
            self.requested.lock().unwrap().push(week);
            if self.fail { return Err(FeedError::InvalidWeek(week)); }

            use chrono::Weekday::*;
            let dishes = if self.full { 12 } else { 1 };
            Ok([Mon, Tue, Wed, Thu, Fri].into_iter().enumerate().flat_map(|(i, weekday)| {
                (0..dishes).map(move |n| MealEntry {
                    date: NaiveDate::from_isoywd_opt(2024, week, weekday).unwrap(),
                    day: format!("{weekday}"),
                    category: "HG1".into(),
                    name: if n == 0 {
                        format!("Dish {week}/{i}")
                    } else {
                        format!("Dish {week}/{i} with dumplings, red cabbage and gravy no. {n}")
                    },
                    labels: vec!["1".into(), "2".into(), "Gf".into()],
                    price: MealPrice {
                        stud: Price::new(1.0),
                        bed: Price::new(2.0),
                        gast: Price::new(3.0),
                    },
                })
            }).collect())
        }
    }

    fn bot(source: Arc<FakeSource>) -> Bot {
        Bot::new(CachedFeed::new(source, Arc::new(MemoryCache::new())), Some(1000))
    }

    fn message(text: &str) -> Message {
        Message {
            message_id: 1,
            from: Some(User { id: 5, username: Some("some_user".into()) }),
            chat: Chat { id: 9 },
            text: Some(text.into()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("/m"), Command::Today);
        assert_eq!(Command::parse("/mensaToday"), Command::Today);
        assert_eq!(Command::parse("Food for today"), Command::Today);
        assert_eq!(Command::parse("/ft"), Command::Tomorrow);
        assert_eq!(Command::parse("/mensaweek@PassauBot"), Command::Week);
        assert_eq!(Command::parse("/mnw"), Command::NextWeek);
        assert_eq!(Command::parse("Food for next week"), Command::NextWeek);
        assert_eq!(Command::parse(" /help "), Command::Help);
        assert_eq!(Command::parse("/contact  hello there "), Command::Contact("hello there".into()));
        assert_eq!(Command::parse("/contact"), Command::Contact(String::new()));
        assert_eq!(Command::parse("/mensa2"), Command::Unknown);
        assert_eq!(Command::parse("hello"), Command::Unknown);
    }

    #[tokio::test]
    async fn today_uses_week_of_date() {
        let source = Arc::new(FakeSource::default());
        let bot = bot(source.clone());

        // friday of week 9
        let out = bot.handle_message(&message("/mensa"), date(2024, 3, 1)).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].chat_id, 9);
        assert!(out[0].text.starts_with("*Fri, 01.03.2024*"), "{}", out[0].text);
        assert!(out[0].text.contains("Dish 9/4"));
        assert_eq!(*source.requested.lock().unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn tomorrow_crosses_into_next_week() {
        let source = Arc::new(FakeSource::default());
        let bot = bot(source.clone());

        // sunday of week 9, monday is in week 10
        let out = bot.handle_message(&message("/mt"), date(2024, 3, 3)).await;
        assert!(out[0].text.contains("Dish 10/0"), "{}", out[0].text);
        assert_eq!(*source.requested.lock().unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn weeks_are_cached() {
        let source = Arc::new(FakeSource::default());
        let bot = bot(source.clone());

        let week = bot.handle_message(&message("/mw"), date(2024, 3, 1)).await;
        assert!(week[0].text.starts_with("*Week 9*"));
        bot.handle_message(&message("/mensa"), date(2024, 3, 1)).await;
        let next = bot.handle_message(&message("/mnw"), date(2024, 3, 1)).await;
        assert!(next[0].text.starts_with("*Week 10*"));

        assert_eq!(*source.requested.lock().unwrap(), vec![9, 10]);
    }

    #[tokio::test]
    async fn full_week_fits_message_limit() {
        let source = Arc::new(FakeSource { full: true, ..Default::default() });
        let bot = bot(source);

        let out = bot.handle_message(&message("/mw"), date(2024, 3, 1)).await;
        assert!(out.len() > 1);
        for msg in &out {
            assert_eq!(msg.chat_id, 9);
            assert!(msg.text.chars().count() <= format::MESSAGE_LIMIT, "{}", msg.text.len());
        }
        assert!(out[0].text.starts_with("*Week 9*"));
        let all: String = out.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(all.matches("gravy").count(), 55);
    }

    #[tokio::test]
    async fn long_contact_message_is_split() {
        let bot = bot(Arc::new(FakeSource::default()));
        let text = format!("/contact {}", "word ".repeat(1000));
        let out = bot.handle_message(&message(&text), date(2024, 3, 1)).await;

        assert!(out.len() > 2);
        assert!(out.iter().all(|v| v.text.chars().count() <= format::MESSAGE_LIMIT));
        assert_eq!(out.last(), Some(&Outgoing::new(9, "Message sent to developer.")));
        assert!(out[..out.len() - 1].iter().all(|v| v.chat_id == 1000));
    }

    #[tokio::test]
    async fn next_week_wraps_around_the_year() {
        let source = Arc::new(FakeSource::default());
        let bot = bot(source.clone());

        // week 52 of 2024 is followed by week 1
        bot.handle_message(&message("/mnw"), date(2024, 12, 27)).await;
        assert_eq!(*source.requested.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn feed_failure_is_reported() {
        let source = Arc::new(FakeSource { fail: true, ..Default::default() });
        let out = bot(source).handle_message(&message("/mw"), date(2024, 3, 1)).await;
        assert_eq!(out, vec![Outgoing::new(9, unavailable())]);
    }

    #[tokio::test]
    async fn contact_forwards_to_admin() {
        let bot = bot(Arc::new(FakeSource::default()));
        let out = bot.handle_message(&message("/contact the soup was cold"), date(2024, 3, 1)).await;

        assert_eq!(out, vec![
            Outgoing::new(1000, "Message from user some\\_user ID=5 in ChatID=9:\nthe soup was cold"),
            Outgoing::new(9, "Message sent to developer."),
        ]);
    }

    #[tokio::test]
    async fn contact_needs_text_and_sender() {
        let bot = bot(Arc::new(FakeSource::default()));

        let out = bot.handle_message(&message("/contact"), date(2024, 3, 1)).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].chat_id, 9);
        assert!(out[0].text.starts_with("Please provide a message"));

        let mut anonymous = message("/contact hi");
        anonymous.from = None;
        let out = bot.handle_message(&anonymous, date(2024, 3, 1)).await;
        assert_eq!(out, vec![Outgoing::new(9,
            "Unable to send message to developer. User information is missing.")]);
    }

    #[tokio::test]
    async fn ignores_non_text() {
        let bot = bot(Arc::new(FakeSource::default()));
        let mut sticker = message("");
        sticker.text = None;
        assert!(bot.handle_message(&sticker, date(2024, 3, 1)).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_and_help() {
        let bot = bot(Arc::new(FakeSource::default()));
        let out = bot.handle_message(&message("/what"), date(2024, 3, 1)).await;
        assert_eq!(out[0].text, "I don't know that command. Try /help");

        let out = bot.handle_message(&message("/help"), date(2024, 3, 1)).await;
        assert_eq!(out[0].text, HELP);
    }
}

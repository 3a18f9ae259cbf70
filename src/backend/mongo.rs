//! Document-store backend.
//!
//! One collection per entity category. Uniqueness is index-backed and the
//! indexes are created at construction — if a required constraint cannot
//! be established, construction fails and nothing starts.
//!
//! Multi-step writes (delete-then-insert for summoners) are not
//! transactional; a crash between the steps can transiently lose a
//! record, which the next idempotent refetch repairs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{Backend, MatchCursor};
use crate::types::{
    ChampionList, FreeRotation, ItemList, League, LeagueTier, MatchRecord, MatchTimeline,
    RunesReforgedList, Summoner, SummonerSpellList,
};
use crate::{FafnirError, Result};

const COLL_CHAMPIONS: &str = "champions";
const COLL_FREE_ROTATION: &str = "free_rotation";
const COLL_SUMMONERS: &str = "summoners";
const COLL_LEAGUES: &str = "leagues";
const COLL_MATCHES: &str = "matches";
const COLL_TIMELINES: &str = "match_timelines";
const COLL_ITEMS: &str = "items";
const COLL_SPELLS: &str = "summoner_spells";
const COLL_RUNES: &str = "runes_reforged";

/// Stored form of a [`Summoner`].
///
/// Carries the normalized name as its own field so the name key is
/// queryable and indexable server-side. Adapter-internal; converted at
/// the boundary.
#[derive(Debug, Serialize, Deserialize)]
struct SummonerDoc {
    normalized_name: String,
    name: String,
    summoner_id: String,
    account_id: String,
    puuid: String,
    profile_icon_id: i32,
    summoner_level: i64,
    revision_date: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    fetched_at: DateTime<Utc>,
}

impl From<&Summoner> for SummonerDoc {
    fn from(s: &Summoner) -> Self {
        Self {
            normalized_name: s.normalized_name(),
            name: s.name.clone(),
            summoner_id: s.summoner_id.clone(),
            account_id: s.account_id.clone(),
            puuid: s.puuid.clone(),
            profile_icon_id: s.profile_icon_id,
            summoner_level: s.summoner_level,
            revision_date: s.revision_date,
            fetched_at: s.fetched_at,
        }
    }
}

impl From<SummonerDoc> for Summoner {
    fn from(d: SummonerDoc) -> Self {
        Self {
            name: d.name,
            summoner_id: d.summoner_id,
            account_id: d.account_id,
            puuid: d.puuid,
            profile_icon_id: d.profile_icon_id,
            summoner_level: d.summoner_level,
            revision_date: d.revision_date,
            fetched_at: d.fetched_at,
        }
    }
}

/// Backend persisting to a mongodb database.
pub struct MongoBackend {
    champions: Collection<ChampionList>,
    free_rotation: Collection<FreeRotation>,
    summoners: Collection<SummonerDoc>,
    leagues: Collection<League>,
    matches: Collection<MatchRecord>,
    timelines: Collection<MatchTimeline>,
    items: Collection<ItemList>,
    spells: Collection<SummonerSpellList>,
    runes: Collection<RunesReforgedList>,
}

impl MongoBackend {
    /// Connect and establish the required indexes.
    ///
    /// Index setup failure is fatal: without the uniqueness constraints
    /// the "one summoner, one record" invariant cannot be kept.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        Self::ensure_indexes(&db).await?;
        Ok(Self {
            champions: db.collection(COLL_CHAMPIONS),
            free_rotation: db.collection(COLL_FREE_ROTATION),
            summoners: db.collection(COLL_SUMMONERS),
            leagues: db.collection(COLL_LEAGUES),
            matches: db.collection(COLL_MATCHES),
            timelines: db.collection(COLL_TIMELINES),
            items: db.collection(COLL_ITEMS),
            spells: db.collection(COLL_SPELLS),
            runes: db.collection(COLL_RUNES),
        })
    }

    async fn ensure_indexes(db: &Database) -> Result<()> {
        fn unique(keys: Document) -> IndexModel {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        }

        let summoners = db.collection::<SummonerDoc>(COLL_SUMMONERS);
        for key in ["normalized_name", "summoner_id", "account_id", "puuid"] {
            let mut keys = Document::new();
            keys.insert(key, 1);
            summoners.create_index(unique(keys)).await?;
        }

        let matches = db.collection::<MatchRecord>(COLL_MATCHES);
        matches
            .create_index(unique(doc! { "game_id": 1, "platform_id": 1 }))
            .await?;
        for key in ["game_version", "map_id", "queue_id"] {
            let mut keys = Document::new();
            keys.insert(key, 1);
            matches
                .create_index(IndexModel::builder().keys(keys).build())
                .await?;
        }

        db.collection::<MatchTimeline>(COLL_TIMELINES)
            .create_index(unique(doc! { "game_id": 1, "platform_id": 1 }))
            .await?;
        db.collection::<League>(COLL_LEAGUES)
            .create_index(unique(doc! { "tier": 1, "queue": 1 }))
            .await?;
        for name in [COLL_ITEMS, COLL_SPELLS, COLL_RUNES] {
            db.collection::<Document>(name)
                .create_index(unique(doc! { "game_version": 1, "language": 1 }))
                .await?;
        }
        Ok(())
    }

    /// Find at most one summoner matching `filter`; two or more matches
    /// is a [`FafnirError::DuplicateRecord`].
    async fn find_single_summoner(&self, filter: Document, key: &str) -> Result<Option<Summoner>> {
        let mut cursor = self.summoners.find(filter).await?;
        let first = cursor.try_next().await?;
        if first.is_some() && cursor.try_next().await?.is_some() {
            return Err(FafnirError::DuplicateRecord {
                collection: COLL_SUMMONERS,
                key: key.to_owned(),
            });
        }
        Ok(first.map(Summoner::from))
    }

    async fn match_cursor(&self, filter: Document) -> Result<MatchCursor> {
        let cursor = self.matches.find(filter).await?;
        Ok(Box::pin(cursor.map_err(FafnirError::from)))
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    mongodb::bson::to_document(value).map_err(|e| FafnirError::Backend(e.to_string()))
}

/// Escape regex metacharacters so a version prefix matches literally.
fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl Backend for MongoBackend {
    async fn get_champions(&self) -> Result<Option<ChampionList>> {
        Ok(self.champions.find_one(doc! {}).await?)
    }

    async fn store_champions(&self, list: &ChampionList) -> Result<()> {
        // Singleton: replace whatever is there.
        self.champions
            .replace_one(doc! {}, list)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_free_rotation(&self) -> Result<Option<FreeRotation>> {
        Ok(self.free_rotation.find_one(doc! {}).await?)
    }

    async fn store_free_rotation(&self, rotation: &FreeRotation) -> Result<()> {
        self.free_rotation
            .replace_one(doc! {}, rotation)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_summoner_by_name(&self, normalized_name: &str) -> Result<Option<Summoner>> {
        self.find_single_summoner(doc! { "normalized_name": normalized_name }, normalized_name)
            .await
    }

    async fn get_summoner_by_summoner_id(&self, summoner_id: &str) -> Result<Option<Summoner>> {
        self.find_single_summoner(doc! { "summoner_id": summoner_id }, summoner_id)
            .await
    }

    async fn get_summoner_by_account_id(&self, account_id: &str) -> Result<Option<Summoner>> {
        self.find_single_summoner(doc! { "account_id": account_id }, account_id)
            .await
    }

    async fn get_summoner_by_puuid(&self, puuid: &str) -> Result<Option<Summoner>> {
        self.find_single_summoner(doc! { "puuid": puuid }, puuid).await
    }

    async fn store_summoner(&self, summoner: &Summoner) -> Result<()> {
        let document = SummonerDoc::from(summoner);
        // Purge every alternate key, then insert. Not transactional; see
        // module docs.
        self.summoners
            .delete_many(doc! {
                "$or": [
                    { "normalized_name": &document.normalized_name },
                    { "summoner_id": &document.summoner_id },
                    { "account_id": &document.account_id },
                    { "puuid": &document.puuid },
                ]
            })
            .await?;
        self.summoners.insert_one(&document).await?;
        Ok(())
    }

    async fn summoner_count(&self) -> Result<u64> {
        Ok(self.summoners.count_documents(doc! {}).await?)
    }

    async fn get_league(&self, tier: LeagueTier, queue: &str) -> Result<Option<League>> {
        Ok(self
            .leagues
            .find_one(doc! { "tier": tier.as_str(), "queue": queue })
            .await?)
    }

    async fn store_league(&self, league: &League) -> Result<()> {
        // replace_one with upsert gives the delete-then-upsert semantics
        // in a single atomic operation.
        self.leagues
            .replace_one(
                doc! { "tier": league.tier.as_str(), "queue": &league.queue },
                league,
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_match(&self, game_id: i64, platform_id: &str) -> Result<Option<MatchRecord>> {
        Ok(self
            .matches
            .find_one(doc! { "game_id": game_id, "platform_id": platform_id })
            .await?)
    }

    async fn store_match(&self, record: &MatchRecord) -> Result<()> {
        // $setOnInsert keeps an existing record untouched: append-only.
        self.matches
            .update_one(
                doc! { "game_id": record.game_id, "platform_id": &record.platform_id },
                doc! { "$setOnInsert": to_document(record)? },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn match_count(&self) -> Result<u64> {
        Ok(self.matches.count_documents(doc! {}).await?)
    }

    async fn get_match_timeline(
        &self,
        game_id: i64,
        platform_id: &str,
    ) -> Result<Option<MatchTimeline>> {
        Ok(self
            .timelines
            .find_one(doc! { "game_id": game_id, "platform_id": platform_id })
            .await?)
    }

    async fn store_match_timeline(&self, timeline: &MatchTimeline) -> Result<()> {
        self.timelines
            .update_one(
                doc! { "game_id": timeline.game_id, "platform_id": &timeline.platform_id },
                doc! { "$setOnInsert": to_document(timeline)? },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_items(&self, game_version: &str, language: &str) -> Result<Option<ItemList>> {
        Ok(self
            .items
            .find_one(doc! { "game_version": game_version, "language": language })
            .await?)
    }

    async fn store_items(&self, list: &ItemList) -> Result<()> {
        self.items
            .replace_one(
                doc! { "game_version": &list.game_version, "language": &list.language },
                list,
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_summoner_spells(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<Option<SummonerSpellList>> {
        Ok(self
            .spells
            .find_one(doc! { "game_version": game_version, "language": language })
            .await?)
    }

    async fn store_summoner_spells(&self, list: &SummonerSpellList) -> Result<()> {
        self.spells
            .replace_one(
                doc! { "game_version": &list.game_version, "language": &list.language },
                list,
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_runes_reforged(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<Option<RunesReforgedList>> {
        Ok(self
            .runes
            .find_one(doc! { "game_version": game_version, "language": language })
            .await?)
    }

    async fn store_runes_reforged(&self, list: &RunesReforgedList) -> Result<()> {
        self.runes
            .replace_one(
                doc! { "game_version": &list.game_version, "language": &list.language },
                list,
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn matches_by_game_version(&self, prefix: &str) -> Result<MatchCursor> {
        let pattern = format!("^{}", regex_escape(prefix));
        self.match_cursor(doc! {
            "game_version": mongodb::bson::Regex {
                pattern,
                options: String::new(),
            }
        })
        .await
    }

    async fn matches_by_map(&self, map_id: i32) -> Result<MatchCursor> {
        self.match_cursor(doc! { "map_id": map_id }).await
    }

    async fn matches_by_queue_range(&self, lo: i32, hi: i32) -> Result<MatchCursor> {
        self.match_cursor(doc! { "queue_id": { "$gte": lo, "$lte": hi } })
            .await
    }
}

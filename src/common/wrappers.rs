//! Zero-cost wrappers for safe indexing.

wrap_usize! {
    #[doc = "Interned strings (words, classes, literals)."]
    Word
    #[doc = "Total map from words to something."]
    map: WordMap
}

wrap_usize! {
    #[doc = "Feature (column) indices."]
    FeatIdx
    #[doc = "Total map from features to something."]
    map: FeatMap
}

wrap_usize! {
    #[doc = "Predicate template indices."]
    PTplIdx
    #[doc = "Total map from predicate templates to something."]
    map: PTplMap
}

wrap_usize! {
    #[doc = "Target template indices."]
    TTplIdx
    #[doc = "Total map from target templates to something."]
    map: TTplMap
}

wrap_usize! {
    #[doc = "Handles of rules in a rule store."]
    RuleIdx
}

wrap_usize! {
    #[doc = "Sentence indices."]
    SentIdx
    #[doc = "Total map from sentences to something."]
    map: SentMap
}

wrap_usize! {
    #[doc = "Ids of learned rules, in application order."]
    RuleId
    #[doc = "Total map from learned rule ids to something."]
    map: RuleIdMap
}

/*!

This is the long-form manual for `mfas_ranking` and `wmtrank`.

## Overview

Human evaluation campaigns ask judges to compare the outputs of two systems for the same
input segment (the *item*). Each comparison says that the first output is better, that the
second one is better, or that both are equally good. `wmtrank` turns all these partial and
sometimes contradictory judgments into one ranking of the systems per item.

For each item:
1. the judgments are aggregated into a *tournament*: for each pair of systems, the
   victories are netted out and the winner gets an edge towards the loser, weighted by its margin.
   If at least half of the judgments of a pair are ties, the pair gets no edge at all.
2. the systems are ordered so that the total weight of the edges going against the order
   (an edge from a system placed lower to a system placed higher) is as small as possible.
   This is the minimum feedback arc set of the tournament, found by a best-first search
   over the sets of already placed systems.
3. ranks are assigned, starting at 1. Two neighbours in the order that have no edge between
   them share the same rank.

## Input formats

The following formats are supported:
* `wmt` The WMT ranking export (default)
* `ans2csv` The crowd answer export

Both formats are CSV files with a header row. The columns are found by name, so their order
does not matter and extra columns are ignored.

The outcome of a comparison may be written with either of these encodings:

| first better | second better | equal |
|--------------|---------------|-------|
| `<`          | `>`           | `=`   |
| `1`          | `2`           | `11`  |

### `wmt`

```text
segmentId,judgeId,system1,system2,cmp
7,J1,sysX,sysY,<
7,J2,sysY,sysX,>
7,J1,sysY,sysZ,<
```

The `judgeId` column is optional.

### `ans2csv`

```text
srclang,trglang,srcIndex,documentId,segmentId,judgeId,system1Number,system1Id,system2Number,system2Id,rank
en,de,7,doc1,3,J1,1,sysX,2,sysY,1
```

The item is `srcIndex`, the systems are `system1Id` and `system2Id`, and the outcome is `rank`.
A language pair can be selected with `--src-lang` and `--tgt-lang`; the other rows are ignored.

### Bad rows

A row that cannot be read (missing field, item id that is not a number, unknown outcome,
empty system name, system compared with itself) is skipped with a warning. The run summary
counts the skipped rows by reason. A missing column in the header stops the run.

## Output

```text
item_id,candidate_id,rank
7,sysX,1
7,sysY,2
7,sysZ,3
```

Items are written in increasing id order. Within an item, candidates are written best first.

## Configuration

`wmtrank` comes with sensible defaults. All the options may be given on the command line or in
a JSON configuration file passed with `--config`. Command line options take precedence.

```json
{
  "input": {
    "filePath": "answers.csv",
    "provider": "ans2csv",
    "sourceLanguage": "en",
    "targetLanguage": "de"
  },
  "rules": {
    "tiebreakMode": "random",
    "randomSeed": "12",
    "maxCandidates": 15,
    "itemTimeoutMs": 10000
  },
  "workers": 4,
  "outputFile": "ranking.csv"
}
```

The `filePath` is relative to the directory of the configuration file.

### Tie breaks

Several orders may explain the judgments equally well. The order that is returned is always the
smallest one according to an order on the candidates, so that runs are reproducible:
- `candidateOrder` (default): candidates are compared by name
- `random`: candidates are compared by a SHA-256 hash of the seed and their name. The
  `randomSeed` option is required.

### Limits

The search is exponential in the number of candidates of an item. Items with more than
`maxCandidates` candidates (default 20) are not ranked. `itemTimeoutMs` sets a time budget for
each item. Items that are not ranked are reported in the summary and do not appear in the output.

 */

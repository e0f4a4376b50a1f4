/*!

# Manual

This crate holds the two computational parts of a voting compass: the
normalization of the candidate survey into position vectors, and the matching
of the answers of a respondent against these vectors. The command line program
`votecompass` wraps them with the file formats described below.

## Statements

A compass is a fixed, ordered list of statements. The order is the contract
between all the data: the first answer of a respondent, the first position of a
candidate and the first statement column of the survey export all refer to the
first statement. The statement set carries a version and a fingerprint (a
SHA-256 over the version and the ordered prompts) to tell two orderings apart.

## The answer scale

| button | meaning           | value  |
|--------|-------------------|--------|
| 0      | strongly disagree | `-1`   |
| 1      | disagree          | `-0.5` |
| 2      | neutral           | `0`    |
| 3      | agree             | `0.5`  |
| 4      | strongly agree    | `1`    |

A candidate position may also be missing (`null`), when the candidate gave no
interpretable answer. Respondents answer every statement; any finite value in
[-1, 1] is accepted, not only the five points of the scale.

## The candidate survey

The candidates answer the same statements through a form, exported as CSV or
Excel with one row per candidate. The identity columns are found with header
fragments, in this order:

| field            | fragments                                       |
|------------------|-------------------------------------------------|
| party            | `Erakond`, `Партия`, `valimisnimekiri`          |
| name             | `Eesnimi`, `perekonnanimi`, `Имя`, `фамилия`    |
| candidate number | `Kandidaadi number`, `Номер кандидата`          |
| timestamp        | `Ajatempel`, `Timestamp`                        |

The first header containing a fragment (ignoring case) is the column of the
field. All the other non-empty columns are statements, in the order of the
statement set. Headers containing one of the fragments above or `newField` are
never statements.

The cells of the statement columns are read as follows:

1. the text is trimmed and lower-cased, then searched for the phrases of the
   scale, strongest first: "ei nõustu üldse" / "полностью не согласен" (`-1`),
   "ei nõustu" / "не согласен" (`-0.5`), "neutraal" / "нейтра" (`0`),
   "täielikult" / "полностью согласен" (`1`), "nõustun" / "согласен" (`0.5`).
2. otherwise, the literal numbers `-1`, `-0.5`, `0`, `0.5`, `1` are accepted, with a
   dot or a comma as the decimal separator.
3. anything else is a missing position.

Two candidates with the same number (or the same name when there is no number)
are reported during the ingestion. When matching, the last one wins.

## Matching

For each candidate, only the statements with a valid candidate position are
compared. On these statements, the cosine similarity between the answers and
the positions is computed and mapped from [-1, 1] to [0, 100]:

```text
percent = (cos + 1) / 2 * 100, rounded to 2 decimals
```

Identical positions give 100, opposite positions give 0, and two directions at
a right angle give 50. The percent is `null` when the candidate has no name, no
positions, no statement in common with the respondent, or when either side is
all neutral on the common statements.

The answers themselves must have the length of the statement set, contain only
finite numbers in [-1, 1]. Otherwise the evaluation fails as a whole. All
neutral answers are accepted: every candidate then gets a `null` percent.

## Configuration

`votecompass` reads a JSON configuration:

```json
{
  "statementSet": {
    "version": "2025-tallinn",
    "statements": [
      { "prompts": { "et": "Ühistransport peaks olema tasuta.", "ru": "Общественный транспорт должен быть бесплатным." } }
    ]
  },
  "dataSource": { "provider": "csv", "filePath": "candidates.csv" },
  "outputSettings": { "datasetPath": "candidates.json", "resultsDirectory": "results" },
  "normalizer": { "rejectDuplicateKeys": false }
}
```

Paths are relative to the configuration file. The `normalizer` section is
optional: `ignoreFragments` and `fieldRules` (a list of `{ "field", "fragments" }`
with `field` one of `party`, `name`, `candidateNumber`, `timestamp`) replace the
defaults above.

```bash
votecompass ingest -c config.json
votecompass evaluate -c config.json --answers '[1, 0, -1, 0.5]' --sort desc
votecompass evaluate -c config.json --answers answers.json --save
votecompass show -c config.json --result-id <id>
```

 */
